use super::PriorityQueue;
use crate::raw::RawPriorityQueue;

impl<K, V> PriorityQueue<K, V> {
    /// Creates an empty queue with room for at least `capacity` entries before the entry
    /// storage reallocates.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue: PriorityQueue<&str, u64> = PriorityQueue::with_capacity(32);
    /// assert!(queue.is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        PriorityQueue {
            raw: RawPriorityQueue::with_capacity(capacity),
        }
    }

    /// Returns how many entries the queue can hold before its entry storage reallocates.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvpq::PriorityQueue;
    ///
    /// let queue: PriorityQueue<&str, u64> = PriorityQueue::with_capacity(32);
    /// assert!(queue.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }
}
