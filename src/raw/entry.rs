/// Insertion sequence number. Unique among the live entries of one queue, so it turns the
/// (value, key) and (key, value) orders into strict total orders even for duplicate pairs.
pub(crate) type Stamp = u64;

/// One key/value association stored in the entry arena.
#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) stamp: Stamp,
}

impl<K, V> Entry<K, V> {
    pub(crate) const fn new(key: K, value: V, stamp: Stamp) -> Self {
        Self {
            key,
            value,
            stamp,
        }
    }

    pub(crate) fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}
