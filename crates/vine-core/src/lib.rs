//! # vine-core
//!
//! Core types and utilities shared across all Vine crates.
//!
//! This crate provides:
//! - `Position` and `ChangeRecord`, the unit of work read from a change feed
//! - `Version` with lenient parsing used to sanitize registry version labels
//! - `VineError` enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Position, ChangeRecord, Version)
//! - `error`: Error types and result aliases

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{VineError, VineResult};
pub use types::{clean_version, ChangeRecord, Position, Version};
