//! Document client with connection pooling and retry logic

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, warn};
use vine_config::FollowConfig;
use vine_core::error::VineError;

use crate::RegistryResult;

/// Media type of the abbreviated registry document
pub const ABBREVIATED_DOCUMENT: &str = "application/vnd.npm.install-v1+json";

/// Configuration for retry logic with optional exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Same delay before every retry
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }
}

/// HTTP client for registry documents
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Base registry URL
    base_url: String,
}

impl RegistryClient {
    /// Create a registry client for `base_url`
    pub fn new(base_url: &str, user_agent: &str) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            // Request timeout
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| VineError::network("Failed to create HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            retry_config: RetryConfig::default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create the client described by the follower configuration
    pub fn from_config(config: &FollowConfig) -> RegistryResult<Self> {
        let client = Self::new(&config.registry_url, &config.user_agent)?;
        Ok(client.with_retry_config(RetryConfig::fixed(
            config.metadata_retries,
            config.metadata_retry_backoff(),
        )))
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// URL a document is fetched from
    pub fn document_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, encode_package_name(name))
    }

    /// Execute an operation, retrying recoverable failures with backoff
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if attempt >= self.retry_config.max_retries || !error.is_recoverable() {
                return Err(error);
            }
            attempt += 1;

            warn!(
                attempt,
                max_retries = self.retry_config.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "request failed, retrying"
            );
            tokio::time::sleep(delay).await;

            delay = std::cmp::min(
                Duration::try_from_secs_f64(delay.as_secs_f64() * self.retry_config.multiplier)
                    .unwrap_or(self.retry_config.max_delay),
                self.retry_config.max_delay,
            );
        }
    }

    /// Fetch the abbreviated document for a package, with retries.
    ///
    /// A 404 is reported as `PackageNotFound` and never retried.
    pub async fn fetch_document(&self, name: &str) -> RegistryResult<Value> {
        let url = self.document_url(name);

        self.with_retry(|| async {
            debug!(url = %url, "fetching document");

            let response = self
                .client
                .get(&url)
                .header(reqwest::header::ACCEPT, ABBREVIATED_DOCUMENT)
                .send()
                .await
                .map_err(|e| VineError::network(format!("Failed to fetch {}", url), e))?;

            match response.status() {
                status if status.is_success() => response
                    .json::<Value>()
                    .await
                    .map_err(|e| VineError::network(format!("Failed to parse document {}", url), e)),
                reqwest::StatusCode::NOT_FOUND => Err(VineError::PackageNotFound {
                    name: name.to_string(),
                }),
                status => Err(VineError::Network {
                    message: format!("Registry returned status {}: {}", status, name),
                    source: None,
                }),
            }
        })
        .await
    }
}

/// Encode package name for URL (handle scoped packages)
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        // Scoped package: @org/pkg -> @org%2fpkg
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}
