use thiserror::Error;

/// Failures reported by [`PriorityQueue`](crate::PriorityQueue).
///
/// Every operation that returns one of these checks for the failure before touching the queue,
/// so an `Err` always means nothing changed.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq, Hash)]
pub enum QueueError {
    /// An extreme value or key was requested from an empty queue.
    #[error("priority queue is empty")]
    Empty,

    /// No entry in the queue carries the requested key.
    #[error("no entry found for key")]
    KeyNotFound,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages() {
        assert_eq!(QueueError::Empty.to_string(), "priority queue is empty");
        assert_eq!(QueueError::KeyNotFound.to_string(), "no entry found for key");
    }

    #[test]
    fn is_core_error() {
        fn assert_error<E: core::error::Error>(_: &E) {}
        assert_error(&QueueError::Empty);
    }
}
