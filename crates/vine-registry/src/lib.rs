//! npm registry clients for the Vine follower
//!
//! This crate provides the HTTP side of following the registry: the
//! continuous changes feed, document fetches with retry logic, and turning a
//! fetched document into per-version units and downloadable assets.

pub mod api;
pub mod client;
pub mod feed;
pub mod normalize;
pub mod resolver;
pub mod split;

// Re-export main types
pub use api::{DistInfo, DocumentError};
pub use client::{RegistryClient, RetryConfig};
pub use feed::{FeedClient, FeedStream};
pub use normalize::{Normalize, RegistryNormalizer};
pub use resolver::{DocumentResolver, Resolution};
pub use split::{Asset, ResolvedDocument, Unit};

use vine_core::error::VineError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, VineError>;
