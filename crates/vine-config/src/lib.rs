//! Configuration loading for the Vine registry follower
//!
//! This crate defines the immutable `FollowConfig` consumed by the follower and
//! the layered loader that builds it from defaults, `vine.toml`, `VINE_*`
//! environment variables and command line overrides.

pub mod follow;
pub mod merge;
pub mod toml;

// Re-export main types
pub use follow::{FailurePolicy, FollowConfig};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};

use vine_core::error::VineError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, VineError>;
