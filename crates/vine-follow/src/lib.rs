//! Resumable registry change feed follower
//!
//! This crate follows a continuous changes feed, resolves every change into
//! its document with bounded concurrency, and keeps a crash-safe checkpoint
//! that only advances past changes the consumer has completed.
//!
//! ## Architecture
//!
//! - `checkpoint`: checkpoint stores and the contiguous-prefix tracker
//! - `decode`: incremental newline-delimited JSON decoding
//! - `reader`: feed connection loop with inactivity watchdog and reconnects
//! - `work`: work units binding a change to its resolver
//! - `scheduler`: bounded concurrent execution and completion handles
//! - `follower`: the library surface tying the pieces together

pub mod checkpoint;
pub mod decode;
pub mod follower;
pub mod reader;
pub mod scheduler;
pub mod work;

// Re-export main types
pub use checkpoint::{
    CheckpointStore, CheckpointTracker, FileCheckpointStore, InProgressEntry, MemoryCheckpointStore,
};
pub use decode::{decode_stream, LineDecoder};
pub use follower::Follower;
pub use reader::{ChangeReader, ChangeSource, ReaderState};
pub use scheduler::{ChangeStream, Completion, FollowItem, Scheduler};
pub use work::{Resolve, WorkUnit};

pub use tokio_util::sync::CancellationToken;
pub use vine_config::{FailurePolicy, FollowConfig};
pub use vine_core::types::{ChangeRecord, Position};
pub use vine_registry::{Resolution, ResolvedDocument};

use vine_core::error::VineError;

/// Result type for follower operations
pub type FollowResult<T> = Result<T, VineError>;
