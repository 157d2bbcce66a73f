//! A keyed double-ended priority queue for Rust.
//!
//! This crate provides [`PriorityQueue`], a container of key/value entries ranked by value.
//! Unlike `std::collections::BinaryHeap` it offers both ends and addressing by key:
//!
//! - [`peek_min`](PriorityQueue::peek_min) / [`peek_max`](PriorityQueue::peek_max) - The smallest and largest entry, in O(1)
//! - [`delete_min`](PriorityQueue::delete_min) / [`delete_max`](PriorityQueue::delete_max) - Remove either end in O(log n)
//! - [`change_value`](PriorityQueue::change_value) - Re-rank an entry found by key in O(log n)
//! - [`merge`](PriorityQueue::merge) - Move every entry of another queue in linear time
//!
//! Duplicate keys, and duplicate key/value pairs, are separate entries.
//!
//! # Example
//!
//! ```
//! use kvpq::{PriorityQueue, QueueError};
//!
//! let mut queue = PriorityQueue::new();
//! queue.insert(1, 5);
//! queue.insert(2, 3);
//! queue.insert(3, 9);
//!
//! assert_eq!(queue.min_value(), Ok(&3));
//! assert_eq!(queue.min_key(), Ok(&2));
//! assert_eq!(queue.max_value(), Ok(&9));
//! assert_eq!(queue.max_key(), Ok(&3));
//!
//! // Move key 2 to the back of the queue.
//! queue.change_value(&2, 10)?;
//! assert_eq!(queue.min_value(), Ok(&5));
//!
//! queue.clear();
//! assert_eq!(queue.min_key(), Err(QueueError::Empty));
//! # Ok::<(), QueueError>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Strong failure safety** - A panicking `Ord` implementation never leaves a queue half updated
//! - **Cache-efficient** - Two B+trees of compact entry handles over one contiguous entry arena
//!
//! # Implementation
//!
//! Entries are stored once, in an arena. Two B+trees (all data in leaves, linked leaf chain)
//! hold handles to them: one sorted by (value, key), one sorted by (key, value). The first and
//! last leaves of the value tree give the extremes directly, and every mutation updates both
//! trees together.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod priority_queue;

pub use error::QueueError;
pub use priority_queue::PriorityQueue;
