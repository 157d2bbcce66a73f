mod arena;
mod entry;
mod handle;
mod node;
mod order;
mod raw_index;
mod raw_priority_queue;

pub(crate) use raw_index::Handles;
pub(crate) use raw_priority_queue::RawPriorityQueue;
