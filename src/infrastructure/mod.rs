//! Collaborators standing in for the platform payment queue.

pub mod in_memory;
pub mod queue;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
