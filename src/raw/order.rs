use core::cmp::Ordering;

use super::entry::Entry;

/// A strict total order over the entries of one queue.
///
/// Implementors only decide how the user-visible fields compare; the stamp always breaks
/// the remaining ties.
pub(crate) trait Order {
    /// Compares `key` and `value` only.
    fn cmp_fields<K: Ord, V: Ord>(a: &Entry<K, V>, b: &Entry<K, V>) -> Ordering;

    #[inline]
    fn cmp<K: Ord, V: Ord>(a: &Entry<K, V>, b: &Entry<K, V>) -> Ordering {
        Self::cmp_fields(a, b).then_with(|| a.stamp.cmp(&b.stamp))
    }
}

/// Value first, then key. Backs the min/max accessors.
pub(crate) enum ByValue {}

/// Key first, then value. Backs lookups by key.
pub(crate) enum ByKey {}

impl Order for ByValue {
    #[inline]
    fn cmp_fields<K: Ord, V: Ord>(a: &Entry<K, V>, b: &Entry<K, V>) -> Ordering {
        a.value.cmp(&b.value).then_with(|| a.key.cmp(&b.key))
    }
}

impl Order for ByKey {
    #[inline]
    fn cmp_fields<K: Ord, V: Ord>(a: &Entry<K, V>, b: &Entry<K, V>) -> Ordering {
        a.key.cmp(&b.key).then_with(|| a.value.cmp(&b.value))
    }
}
