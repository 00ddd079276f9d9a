//! Error types and result aliases for Vine operations.
//!
//! Provides a unified error type that covers every failure the follower can
//! hit, from configuration loading to document resolution, with actionable
//! error messages.

use thiserror::Error;

use crate::types::Position;

/// Unified error type for all Vine operations
#[derive(Error, Debug)]
pub enum VineError {
    // Config errors
    #[error("Failed to parse vine.toml: {message}")]
    TomlParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to process seq {position}: {error} {reason}")]
    Document {
        position: Position,
        error: String,
        reason: String,
    },

    // Feed errors
    #[error("Malformed feed line: {message}")]
    MalformedLine {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Change feed stalled: no records for {elapsed_ms}ms")]
    Inactivity { elapsed_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Vine operations
pub type VineResult<T> = Result<T, VineError>;

impl VineError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a malformed line error from a JSON parse failure
    pub fn malformed_line(line: &str, source: serde_json::Error) -> Self {
        Self::MalformedLine {
            message: format!("{} in {:?}", source, truncate(line, 120)),
            source: Some(source),
        }
    }

    /// Check if this error is recoverable by reconnecting or retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VineError::Network { .. }
                | VineError::Io { .. }
                | VineError::MalformedLine { .. }
                | VineError::Inactivity { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            VineError::ConfigValidation { .. } | VineError::TomlParse { .. } => {
                Some("Check vine.toml and VINE_* environment variables")
            },
            VineError::Network { .. } => Some("Check your internet connection and the registry URLs"),
            VineError::Document { .. } => {
                Some("Restart the follower, or set failure_policy = \"skip\" to log and continue")
            },
            VineError::Io { .. } => Some("Check that the checkpoint path is writable"),
            _ => None,
        }
    }
}

fn truncate(line: &str, max: usize) -> &str {
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let err = VineError::Network {
            message: "reset".to_string(),
            source: None,
        };
        assert!(err.is_recoverable());
        assert!(VineError::Inactivity { elapsed_ms: 100 }.is_recoverable());

        let err = VineError::Document {
            position: Position::new(7),
            error: "forbidden".to_string(),
            reason: "nope".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(!VineError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_document_error_message() {
        let err = VineError::Document {
            position: Position::new(42),
            error: "forbidden".to_string(),
            reason: "private package".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to process seq 42: forbidden private package");
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_malformed_line_truncates() {
        let line = format!("{{\"seq\": {}", "9".repeat(500));
        let source = serde_json::from_str::<serde_json::Value>(&line).unwrap_err();
        let err = VineError::malformed_line(&line, source);

        assert!(err.to_string().len() < 300);
        assert!(std::error::Error::source(&err).is_some());
    }
}
