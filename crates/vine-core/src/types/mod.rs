//! Core data types for following a registry change feed.
//!
//! This module provides the fundamental types used throughout Vine:
//! - Feed positions used as the resume cursor
//! - Change records decoded from the feed
//! - Version types used to sanitize registry version labels

pub mod change;
pub mod position;
pub mod version;

// Re-export all public types
pub use change::ChangeRecord;
pub use position::Position;
pub use version::{clean_version, Version, VersionError};
