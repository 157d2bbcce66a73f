use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::mem;

use tracing::{debug, trace};

use super::arena::Arena;
use super::entry::{Entry, Stamp};
use super::handle::Handle;
use super::order::{ByKey, ByValue, Order};
use super::raw_index::{Cursor, Handles, RawIndex};

/// The dual-index store backing `PriorityQueue`.
///
/// Entries live once, in `entries`. `by_value` and `by_key` hold the same set of handles,
/// sorted by (value, key, stamp) and (key, value, stamp) respectively. Every mutation locates
/// its positions in both indexes before touching either, so a panicking `Ord` can never leave
/// the indexes disagreeing.
#[derive(Clone)]
pub(crate) struct RawPriorityQueue<K, V> {
    entries: Arena<Entry<K, V>>,
    by_value: RawIndex<ByValue>,
    by_key: RawIndex<ByKey>,
    /// Stamp for the next entry; greater than every live stamp.
    next_stamp: Stamp,
}

/// Which queue an entry came from while two queues are being interleaved.
#[derive(Clone, Copy)]
enum Origin {
    Left(Handle),
    Right(Handle),
}

impl<K, V> RawPriorityQueue<K, V> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Arena::new(),
            by_value: RawIndex::new(),
            by_key: RawIndex::new(),
            next_stamp: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arena::with_capacity(capacity),
            by_value: RawIndex::with_capacity(capacity),
            by_key: RawIndex::with_capacity(capacity),
            next_stamp: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub(crate) const fn len(&self) -> usize {
        self.by_value.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.by_value.clear();
        self.by_key.clear();
        self.next_stamp = 0;
    }

    /// Key and value of a live entry.
    pub(crate) fn pair(&self, handle: Handle) -> (&K, &V) {
        let entry = self.entries.get(handle);
        (&entry.key, &entry.value)
    }

    /// The entry ranked first by (value, key).
    pub(crate) fn peek_min(&self) -> Option<(&K, &V)> {
        self.by_value.first().map(|handle| self.pair(handle))
    }

    /// The entry ranked last by (value, key).
    pub(crate) fn peek_max(&self) -> Option<(&K, &V)> {
        self.by_value.last().map(|handle| self.pair(handle))
    }

    /// Handles in ascending (value, key) order.
    pub(crate) fn value_order(&self) -> Handles<'_> {
        self.by_value.handles()
    }

    /// Consumes the queue, returning its pairs in ascending (value, key) order.
    pub(crate) fn into_sorted_pairs(mut self) -> Vec<(K, V)> {
        let order: Vec<Handle> = self.by_value.handles().collect();
        order.into_iter().map(|handle| self.entries.take(handle).into_pair()).collect()
    }

    fn take_stamp(&mut self) -> Stamp {
        let stamp = self.next_stamp;
        self.next_stamp = stamp.checked_add(1).expect("`RawPriorityQueue::take_stamp()` - stamps exhausted!");
        stamp
    }
}

impl<K: Ord, V: Ord> RawPriorityQueue<K, V> {
    pub(crate) fn insert(&mut self, key: K, value: V) {
        let stamp = self.take_stamp();
        self.paired_insert(Entry::new(key, value, stamp));
        trace!(len = self.len(), "inserted entry");
    }

    /// Removes and returns the entry ranked first by (value, key).
    pub(crate) fn pop_min(&mut self) -> Option<(K, V)> {
        let cursor = self.by_value.seek_first()?;
        let handle = self.by_value.entry_at(&cursor)?;
        Some(self.paired_erase(handle, cursor).into_pair())
    }

    /// Removes and returns the entry ranked last by (value, key).
    pub(crate) fn pop_max(&mut self) -> Option<(K, V)> {
        let cursor = self.by_value.seek_last()?;
        let handle = self.by_value.entry_at(&cursor)?;
        Some(self.paired_erase(handle, cursor).into_pair())
    }

    /// The entry `change_value` would update for `key`: the first one in key order, which is
    /// the smallest value under that key, and among equal values the oldest.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.by_key.lower_bound(|handle| self.entries.get(handle).key.borrow().cmp(key))?;
        (self.entries.get(handle).key.borrow().cmp(key) == Ordering::Equal).then_some(handle)
    }

    /// Gives the entry found by [`find`](Self::find) the value `value`, re-ranking it in both
    /// indexes. Returns the replaced value, or `None` (with nothing changed) if no entry has
    /// the key.
    pub(crate) fn change_value<Q>(&mut self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.find(key)?;
        let value_cursor = self.by_value.seek_handle(&self.entries, handle);
        let key_cursor = self.by_key.seek_handle(&self.entries, handle);
        let value_before = self.by_value.predecessor(&value_cursor);
        let key_before = self.by_key.predecessor(&key_cursor);

        // The entry stays in the arena while it is out of both indexes.
        self.by_value.remove_at(value_cursor);
        self.by_key.remove_at(key_cursor);
        let stamp = self.take_stamp();
        let entry = self.entries.get_mut(handle);
        let previous = (mem::replace(&mut entry.value, value), mem::replace(&mut entry.stamp, stamp));

        let guard = Reinstate {
            queue: self,
            handle,
            value_before,
            key_before,
            previous: Some(previous),
        };
        let entry = guard.queue.entries.get(handle);
        let value_cursor = guard.queue.by_value.seek_entry(&guard.queue.entries, entry);
        let key_cursor = guard.queue.by_key.seek_entry(&guard.queue.entries, entry);
        let old_value = guard.disarm();

        self.by_value.insert_at(value_cursor, handle);
        self.by_key.insert_at(key_cursor, handle);
        trace!(len = self.len(), "changed entry value");
        Some(old_value)
    }

    /// Moves every entry of `other` into `self`, leaving `other` empty.
    ///
    /// Both orders are produced by interleaving the already sorted indexes, and only then are
    /// entries moved and the indexes rebuilt. If a comparison panics, neither queue has changed.
    pub(crate) fn merge(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            mem::swap(self, other);
            return;
        }

        debug!(left = self.len(), right = other.len(), "merging queues");

        let by_value = interleave(&self.entries, &self.by_value, &other.entries, &other.by_value);
        let by_key = interleave(&self.entries, &self.by_key, &other.entries, &other.by_key);

        // Nothing below runs user code.
        let mut other = mem::take(other);
        let mut relocated: Vec<Option<Handle>> = alloc::vec![None; other.entries.slot_count()];
        for (old_handle, entry) in other.entries.drain() {
            relocated[old_handle.to_index()] = Some(self.entries.alloc(entry));
        }

        let resolve = |origin: Origin| match origin {
            Origin::Left(handle) => handle,
            Origin::Right(handle) => {
                relocated[handle.to_index()].expect("`RawPriorityQueue::merge()` - entry was not relocated!")
            }
        };
        let by_value: Vec<Handle> = by_value.into_iter().map(resolve).collect();
        let by_key: Vec<Handle> = by_key.into_iter().map(resolve).collect();

        // Stamps restart at the merged value order. Equal entries sit left-first in both
        // orders, so the numbering agrees with the key index too.
        let mut next_stamp: Stamp = 0;
        for &handle in &by_value {
            self.entries.get_mut(handle).stamp = next_stamp;
            next_stamp += 1;
        }

        self.by_value = RawIndex::from_sorted(&by_value);
        self.by_key = RawIndex::from_sorted(&by_key);
        self.next_stamp = next_stamp;

        debug!(len = self.len(), "merged queues");
    }

    /// Adds `entry` to the arena and both indexes.
    fn paired_insert(&mut self, entry: Entry<K, V>) -> Handle {
        let value_cursor = self.by_value.seek_entry(&self.entries, &entry);
        let key_cursor = self.by_key.seek_entry(&self.entries, &entry);

        let handle = self.entries.alloc(entry);
        self.by_value.insert_at(value_cursor, handle);
        self.by_key.insert_at(key_cursor, handle);
        handle
    }

    /// Removes `handle`, already located at `value_cursor` in the value index, from both
    /// indexes and the arena.
    fn paired_erase(&mut self, handle: Handle, value_cursor: Cursor) -> Entry<K, V> {
        // The key index is searched for this exact entry; its stamp rules out any duplicate.
        let key_cursor = self.by_key.seek_handle(&self.entries, handle);

        let from_values = self.by_value.remove_at(value_cursor);
        let from_keys = self.by_key.remove_at(key_cursor);
        debug_assert_eq!(from_values, handle, "value index removed the wrong entry");
        debug_assert_eq!(from_keys, handle, "key index removed the wrong entry");

        trace!(len = self.len(), "erased entry");
        self.entries.take(handle)
    }
}

/// Puts an entry that `change_value` took out of both indexes back where it was, with its
/// old value and stamp, unless disarmed first. Runs when a comparison panics mid-update.
struct Reinstate<'a, K, V> {
    queue: &'a mut RawPriorityQueue<K, V>,
    handle: Handle,
    value_before: Option<Handle>,
    key_before: Option<Handle>,
    previous: Option<(V, Stamp)>,
}

impl<K, V> Reinstate<'_, K, V> {
    /// Keeps the update and hands back the replaced value.
    fn disarm(mut self) -> V {
        match self.previous.take() {
            Some((value, _)) => value,
            None => unreachable!("`Reinstate::disarm()` - already disarmed!"),
        }
    }
}

impl<K, V> Drop for Reinstate<'_, K, V> {
    fn drop(&mut self) {
        let Some((value, stamp)) = self.previous.take() else {
            return;
        };

        debug!("restoring entry after a panic during change_value");
        let queue = &mut *self.queue;
        let entry = queue.entries.get_mut(self.handle);
        entry.value = value;
        entry.stamp = stamp;
        queue.by_value = reinsert_after(&queue.by_value, self.handle, self.value_before);
        queue.by_key = reinsert_after(&queue.by_key, self.handle, self.key_before);
    }
}

/// Rebuilds `index` with `handle` placed right after `before` (first if `None`). Linear, but
/// performs no comparisons.
fn reinsert_after<O>(index: &RawIndex<O>, handle: Handle, before: Option<Handle>) -> RawIndex<O> {
    let mut order = Vec::with_capacity(index.len() + 1);
    if before.is_none() {
        order.push(handle);
    }
    for existing in index.handles() {
        order.push(existing);
        if Some(existing) == before {
            order.push(handle);
        }
    }
    RawIndex::from_sorted(&order)
}

impl<K, V> Default for RawPriorityQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Merges two sorted indexes by `O`'s field order. On equal fields the left entry goes first.
fn interleave<O: Order, K: Ord, V: Ord>(
    left_entries: &Arena<Entry<K, V>>,
    left: &RawIndex<O>,
    right_entries: &Arena<Entry<K, V>>,
    right: &RawIndex<O>,
) -> Vec<Origin> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_handles = left.handles().peekable();
    let mut right_handles = right.handles().peekable();

    loop {
        match (left_handles.peek(), right_handles.peek()) {
            (Some(&l), Some(&r)) => {
                if O::cmp_fields(left_entries.get(l), right_entries.get(r)) == Ordering::Greater {
                    merged.push(Origin::Right(r));
                    right_handles.next();
                } else {
                    merged.push(Origin::Left(l));
                    left_handles.next();
                }
            }
            (Some(_), None) => {
                merged.extend(left_handles.map(Origin::Left));
                break;
            }
            (None, _) => {
                merged.extend(right_handles.map(Origin::Right));
                break;
            }
        }
    }

    merged
}
