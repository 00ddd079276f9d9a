//! Follower configuration.
//!
//! `FollowConfig` is fully populated before any follower component is built
//! and never mutated afterwards.

use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use url::Url;
use vine_core::error::VineError;
use vine_core::types::Position;

use crate::ConfigResult;

/// What the follower does when a change cannot be resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// End the change stream with the error
    #[default]
    FailFast,
    /// Log the error and release the position without a change
    Skip,
}

impl std::str::FromStr for FailurePolicy {
    type Err = VineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fail-fast" => Ok(FailurePolicy::FailFast),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(VineError::ConfigValidation {
                field: "failure_policy".to_string(),
                reason: format!("expected 'fail-fast' or 'skip', got '{}'", other),
            }),
        }
    }
}

/// Complete follower configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FollowConfig {
    /// User-Agent sent with every request
    pub user_agent: String,

    /// Continuous changes endpoint
    pub feed_url: String,

    /// Base URL documents are fetched from
    pub registry_url: String,

    /// File holding the last confirmed position
    pub checkpoint_path: Utf8PathBuf,

    /// How many changes are resolved at once
    pub concurrency: usize,

    /// Restart the feed when no record arrives for this long
    pub inactivity_timeout_ms: u64,

    /// Wait before reconnecting to the feed
    pub inactivity_backoff_ms: u64,

    /// Extra attempts when fetching a document fails
    pub metadata_retries: u32,

    /// Wait between document fetch attempts
    pub metadata_retry_backoff_ms: u64,

    /// Keep-alive interval requested from the feed
    pub heartbeat_ms: u64,

    /// Start from this position instead of the stored checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<Position>,

    /// Behaviour on a terminal document error
    pub failure_policy: FailurePolicy,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            user_agent: "npm-registry-follower".to_string(),
            feed_url: "https://replicate.npmjs.com/registry/_changes".to_string(),
            registry_url: "https://registry.npmjs.com".to_string(),
            checkpoint_path: Utf8PathBuf::from("/tmp/registry-follow.seq"),
            concurrency: 50,
            inactivity_timeout_ms: 3_600_000,
            inactivity_backoff_ms: 5_000,
            metadata_retries: 5,
            metadata_retry_backoff_ms: 5_000,
            heartbeat_ms: 30_000,
            since: None,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

impl FollowConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    pub fn inactivity_backoff(&self) -> Duration {
        Duration::from_millis(self.inactivity_backoff_ms)
    }

    pub fn metadata_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.metadata_retry_backoff_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    /// Validate field values, returning the config on success
    pub fn validate(self) -> ConfigResult<Self> {
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }

        if self.inactivity_timeout_ms == 0 {
            return Err(invalid("inactivity_timeout_ms", "must be greater than zero"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.checkpoint_path.as_str().is_empty() {
            return Err(invalid("checkpoint_path", "must not be empty"));
        }

        for (field, value) in [("feed_url", &self.feed_url), ("registry_url", &self.registry_url)] {
            let url = Url::parse(value)
                .map_err(|e| invalid(field, &format!("'{}' is not a valid URL: {}", value, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(field, &format!("unsupported scheme '{}'", url.scheme())));
            }
        }

        Ok(self)
    }
}

fn invalid(field: &str, reason: &str) -> VineError {
    VineError::ConfigValidation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FollowConfig::default();
        assert_eq!(config.concurrency, 50);
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(3600));
        assert_eq!(config.metadata_retries, 5);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert!(config.since.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = FollowConfig {
            concurrency: 0,
            ..FollowConfig::default()
        };

        match config.validate().unwrap_err() {
            VineError::ConfigValidation { field, .. } => assert_eq!(field, "concurrency"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = FollowConfig {
            registry_url: "not a url".to_string(),
            ..FollowConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FollowConfig {
            feed_url: "ftp://replicate.example.com/_changes".to_string(),
            ..FollowConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("skip".parse::<FailurePolicy>().unwrap(), FailurePolicy::Skip);
        assert_eq!("fail-fast".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailFast);
        assert!("ignore".parse::<FailurePolicy>().is_err());
    }
}
