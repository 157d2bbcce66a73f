use alloc::vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::mem;

use crate::QueueError;
use crate::raw::{Handles, RawPriorityQueue};

mod capacity;

/// A keyed double-ended priority queue.
///
/// Each entry is a key paired with a value. Entries are ranked by value, with the key breaking
/// ties, so the smallest and largest entries are available in constant time. Keys are not
/// unique: the same key, or the same whole pair, may be stored any number of times, and every
/// copy is a separate entry.
///
/// Entries are also indexed by key, which lets [`change_value`] re-rank an entry in
/// logarithmic time without searching the queue.
///
/// Iterators obtained from [`PriorityQueue::iter`] and [`PriorityQueue::into_iter`] produce
/// entries in ascending (value, key) order. Comparisons between whole queues and hashing use
/// the same order.
///
/// It is a logic error for a key or value to be modified in such a way that its ordering
/// relative to any other key or value, as determined by the [`Ord`] trait, changes while it is
/// in the queue. This is normally only possible through [`Cell`], [`RefCell`], global state,
/// I/O, or unsafe code. The behavior resulting from such a logic error is not specified, but
/// will be encapsulated to the `PriorityQueue` that observed the logic error and not result in
/// undefined behavior.
///
/// # Examples
///
/// ```
/// use kvpq::PriorityQueue;
///
/// // Tasks keyed by name, ranked by due time.
/// let mut timers = PriorityQueue::new();
/// timers.insert("flush", 30);
/// timers.insert("heartbeat", 10);
/// timers.insert("compact", 90);
///
/// assert_eq!(timers.min_key(), Ok(&"heartbeat"));
/// assert_eq!(timers.max_value(), Ok(&90));
///
/// // The heartbeat fired; schedule it again.
/// timers.change_value("heartbeat", 40).unwrap();
/// assert_eq!(timers.peek_min(), Some((&"flush", &30)));
///
/// // Fire everything that is due by t = 45.
/// while let Ok(&due) = timers.min_value() {
///     if due > 45 {
///         break;
///     }
///     timers.delete_min();
/// }
/// assert_eq!(timers.len(), 1);
/// ```
///
/// A `PriorityQueue` with a known list of entries can be initialized from an array:
///
/// ```
/// use kvpq::PriorityQueue;
///
/// let queue = PriorityQueue::from([("b", 2), ("a", 2), ("c", 1)]);
/// let order: Vec<_> = queue.iter().collect();
/// assert_eq!(order, [(&"c", &1), (&"a", &2), (&"b", &2)]);
/// ```
///
/// [`change_value`]: PriorityQueue::change_value
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
pub struct PriorityQueue<K, V> {
    raw: RawPriorityQueue<K, V>,
}

/// An iterator over the entries of a `PriorityQueue`, in ascending (value, key) order.
///
/// This `struct` is created by the [`iter`] method on [`PriorityQueue`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use kvpq::PriorityQueue;
///
/// let queue = PriorityQueue::from([(1, "b"), (2, "a")]);
/// let mut iter = queue.iter();
/// assert_eq!(iter.next(), Some((&2, &"a")));
/// assert_eq!(iter.next_back(), Some((&1, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: PriorityQueue::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    queue: &'a RawPriorityQueue<K, V>,
    handles: Handles<'a>,
}

/// An owning iterator over the entries of a `PriorityQueue`, in ascending (value, key) order.
///
/// This `struct` is created by the [`into_iter`] method on [`PriorityQueue`]
/// (provided by the [`IntoIterator`] trait). See its documentation for more.
///
/// [`into_iter`]: IntoIterator::into_iter
#[derive(Default)]
pub struct IntoIter<K, V> {
    inner: vec::IntoIter<(K, V)>,
}

impl<K, V> PriorityQueue<K, V> {
    /// Makes a new, empty `PriorityQueue`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::new();
    ///
    /// // entries can now be inserted into the empty queue
    /// queue.insert("a", 1);
    /// ```
    #[must_use]
    pub const fn new() -> PriorityQueue<K, V> {
        PriorityQueue {
            raw: RawPriorityQueue::new(),
        }
    }

    /// Clears the queue, removing all entries.
    ///
    /// # Complexity
    ///
    /// O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::new();
    /// queue.insert("a", 1);
    /// queue.clear();
    /// assert!(queue.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the number of entries in the queue.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::new();
    /// assert_eq!(queue.len(), 0);
    /// queue.insert("a", 1);
    /// queue.insert("a", 1);
    /// assert_eq!(queue.len(), 2);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the queue contains no entries.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the entry with the smallest value, or `None` if the queue is empty.
    ///
    /// Among entries with the smallest value, the one with the smallest key is returned.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::new();
    /// assert_eq!(queue.peek_min(), None);
    /// queue.insert("b", 1);
    /// queue.insert("a", 1);
    /// queue.insert("c", 0);
    /// assert_eq!(queue.peek_min(), Some((&"c", &0)));
    /// ```
    #[must_use]
    pub fn peek_min(&self) -> Option<(&K, &V)> {
        self.raw.peek_min()
    }

    /// Returns the entry with the largest value, or `None` if the queue is empty.
    ///
    /// Among entries with the largest value, the one with the largest key is returned.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([("a", 5), ("b", 5), ("c", 1)]);
    /// assert_eq!(queue.peek_max(), Some((&"b", &5)));
    /// ```
    #[must_use]
    pub fn peek_max(&self) -> Option<(&K, &V)> {
        self.raw.peek_max()
    }

    /// Returns the smallest value in the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::{PriorityQueue, QueueError};
    ///
    /// let mut queue = PriorityQueue::new();
    /// assert_eq!(queue.min_value(), Err(QueueError::Empty));
    /// queue.insert(1, 5);
    /// queue.insert(2, 3);
    /// assert_eq!(queue.min_value(), Ok(&3));
    /// ```
    pub fn min_value(&self) -> Result<&V, QueueError> {
        self.raw.peek_min().map(|(_, value)| value).ok_or(QueueError::Empty)
    }

    /// Returns the largest value in the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([(1, 5), (2, 3), (3, 9)]);
    /// assert_eq!(queue.max_value(), Ok(&9));
    /// ```
    pub fn max_value(&self) -> Result<&V, QueueError> {
        self.raw.peek_max().map(|(_, value)| value).ok_or(QueueError::Empty)
    }

    /// Returns the key of the entry with the smallest value.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([(1, 5), (2, 3), (3, 9)]);
    /// assert_eq!(queue.min_key(), Ok(&2));
    /// ```
    pub fn min_key(&self) -> Result<&K, QueueError> {
        self.raw.peek_min().map(|(key, _)| key).ok_or(QueueError::Empty)
    }

    /// Returns the key of the entry with the largest value.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([(1, 5), (2, 3), (3, 9)]);
    /// assert_eq!(queue.max_key(), Ok(&3));
    /// ```
    pub fn max_key(&self) -> Result<&K, QueueError> {
        self.raw.peek_max().map(|(key, _)| key).ok_or(QueueError::Empty)
    }

    /// Swaps the contents of two queues.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut a = PriorityQueue::from([("a", 1)]);
    /// let mut b = PriorityQueue::new();
    /// a.swap(&mut b);
    /// assert!(a.is_empty());
    /// assert_eq!(b.len(), 1);
    /// ```
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Gets an iterator over the entries of the queue, in ascending (value, key) order.
    ///
    /// # Complexity
    ///
    /// O(1) to create, amortized O(1) per entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([("x", 3), ("y", 1), ("z", 2)]);
    /// let keys: Vec<_> = queue.iter().map(|(key, _)| *key).collect();
    /// assert_eq!(keys, ["y", "z", "x"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            queue: &self.raw,
            handles: self.raw.value_order(),
        }
    }
}

impl<K: Ord, V: Ord> PriorityQueue<K, V> {
    /// Inserts a key-value pair into the queue.
    ///
    /// Duplicates are never rejected: inserting a key, or a whole pair, that is already present
    /// adds another entry.
    ///
    /// If a comparison panics, the queue is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the queue already holds the largest number of entries it can address.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::new();
    /// queue.insert(37, "a");
    /// queue.insert(37, "a");
    /// assert_eq!(queue.len(), 2);
    /// ```
    pub fn insert(&mut self, key: K, value: V) {
        self.raw.insert(key, value);
    }

    /// Removes the entry with the smallest value. Does nothing if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::from([(1, 5), (2, 3)]);
    /// queue.delete_min();
    /// assert_eq!(queue.min_key(), Ok(&1));
    ///
    /// queue.clear();
    /// queue.delete_min();
    /// assert!(queue.is_empty());
    /// ```
    pub fn delete_min(&mut self) {
        self.raw.pop_min();
    }

    /// Removes the entry with the largest value. Does nothing if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::from([(1, 5), (2, 3)]);
    /// queue.delete_max();
    /// assert_eq!(queue.max_key(), Ok(&2));
    /// ```
    pub fn delete_max(&mut self) {
        self.raw.pop_max();
    }

    /// Removes and returns the entry with the smallest value, or `None` if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::from([("a", 2), ("b", 1)]);
    /// assert_eq!(queue.pop_min(), Some(("b", 1)));
    /// assert_eq!(queue.pop_min(), Some(("a", 2)));
    /// assert_eq!(queue.pop_min(), None);
    /// ```
    pub fn pop_min(&mut self) -> Option<(K, V)> {
        self.raw.pop_min()
    }

    /// Removes and returns the entry with the largest value, or `None` if the queue is empty.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::from([("a", 2), ("b", 1)]);
    /// assert_eq!(queue.pop_max(), Some(("a", 2)));
    /// ```
    pub fn pop_max(&mut self) -> Option<(K, V)> {
        self.raw.pop_max()
    }

    /// Replaces the value of one entry with the given key and returns the replaced value.
    ///
    /// When several entries share the key, the one with the smallest value is updated (among
    /// equal values, the oldest). The entry is re-ranked under its new value; setting the value
    /// it already has is allowed and simply re-inserts it.
    ///
    /// The key may be any borrowed form of the queue's key type, but the ordering on the
    /// borrowed form *must* match the ordering on the key type.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::KeyNotFound`], leaving the queue unchanged, if no entry has the key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::{PriorityQueue, QueueError};
    ///
    /// let mut queue = PriorityQueue::from([(1, 5), (2, 3), (3, 9)]);
    /// assert_eq!(queue.change_value(&2, 10), Ok(3));
    /// assert_eq!(queue.min_value(), Ok(&5));
    /// assert_eq!(queue.peek_max(), Some((&2, &10)));
    ///
    /// assert_eq!(queue.change_value(&4, 0), Err(QueueError::KeyNotFound));
    /// ```
    pub fn change_value<Q>(&mut self, key: &Q, value: V) -> Result<V, QueueError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.change_value(key, value).ok_or(QueueError::KeyNotFound)
    }

    /// Returns the value [`change_value`](Self::change_value) would replace for `key`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([("job", 7), ("job", 4)]);
    /// assert_eq!(queue.get("job"), Some(&4));
    /// assert_eq!(queue.get("idle"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).map(|handle| self.raw.pair(handle).1)
    }

    /// Returns `true` if any entry has the given key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([("job", 7)]);
    /// assert!(queue.contains_key("job"));
    /// assert!(!queue.contains_key("idle"));
    /// ```
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).is_some()
    }

    /// Moves all entries from `other` into `self`, leaving `other` empty.
    ///
    /// Entries already in `self` rank ahead of equal entries that came from `other`. If a
    /// comparison panics, both queues are left unchanged.
    ///
    /// # Complexity
    ///
    /// O(n + m), where m is the length of `other`. O(1) when either queue is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let mut a = PriorityQueue::from([("a", 1), ("b", 4)]);
    /// let mut b = PriorityQueue::from([("c", 2), ("a", 1)]);
    /// a.merge(&mut b);
    ///
    /// assert_eq!(a.len(), 4);
    /// assert!(b.is_empty());
    /// let values: Vec<_> = a.iter().map(|(_, v)| *v).collect();
    /// assert_eq!(values, [1, 1, 2, 4]);
    /// ```
    ///
    /// A queue cannot be merged into itself:
    ///
    /// ```compile_fail
    /// use kvpq::PriorityQueue;
    ///
    /// let mut queue = PriorityQueue::from([("a", 1)]);
    /// queue.merge(&mut queue);
    /// ```
    pub fn merge(&mut self, other: &mut Self) {
        self.raw.merge(&mut other.raw);
    }
}

impl<K: Clone, V: Clone> Clone for PriorityQueue<K, V> {
    fn clone(&self) -> Self {
        PriorityQueue {
            raw: self.raw.clone(),
        }
    }
}

impl<K: Hash, V: Hash> Hash for PriorityQueue<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self {
            v.hash(state);
            k.hash(state);
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for PriorityQueue<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|((ka, va), (kb, vb))| va == vb && ka == kb)
    }
}

impl<K: Eq, V: Eq> Eq for PriorityQueue<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for PriorityQueue<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().map(value_first).partial_cmp(other.iter().map(value_first))
    }
}

impl<K: Ord, V: Ord> Ord for PriorityQueue<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().map(value_first).cmp(other.iter().map(value_first))
    }
}

fn value_first<'a, K, V>((key, value): (&'a K, &'a V)) -> (&'a V, &'a K) {
    (value, key)
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PriorityQueue<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for PriorityQueue<K, V> {
    fn default() -> Self {
        PriorityQueue::new()
    }
}

impl<K: Ord, V: Ord> FromIterator<(K, V)> for PriorityQueue<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut queue = PriorityQueue::new();
        queue.extend(iter);
        queue
    }
}

impl<K: Ord, V: Ord> Extend<(K, V)> for PriorityQueue<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PriorityQueue<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V> IntoIterator for PriorityQueue<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the queue, in ascending (value, key) order.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue = PriorityQueue::from([("a", 2), ("b", 1)]);
    /// let mut iter = queue.into_iter();
    /// assert_eq!(iter.next(), Some(("b", 1)));
    /// assert_eq!(iter.next_back(), Some(("a", 2)));
    /// ```
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.raw.into_sorted_pairs().into_iter(),
        }
    }
}

impl<K: Ord, V: Ord, const N: usize> From<[(K, V); N]> for PriorityQueue<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let queue = self.queue;
        self.handles.next().map(|handle| queue.pair(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let queue = self.queue;
        self.handles.next_back().map(|handle| queue.pair(handle))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.handles.len()
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            queue: self.queue,
            handles: self.handles.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.as_slice()).finish()
    }
}
