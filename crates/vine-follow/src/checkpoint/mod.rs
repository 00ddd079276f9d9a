//! Checkpointing
//!
//! The checkpoint is the last position known to be completely processed and
//! the only durable state of the follower. Stores persist it; the tracker
//! decides when it may advance.

pub mod store;
pub mod tracker;

pub use store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use tracker::{CheckpointTracker, InProgressEntry};
