//! Continuous changes feed client
//!
//! Opens the long-lived `_changes?feed=continuous` request and hands back the
//! raw body as a stream of byte chunks. Line decoding and the inactivity
//! watchdog live with the follower.

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::{Client, ClientBuilder};
use tracing::info;
use vine_config::FollowConfig;
use vine_core::error::VineError;
use vine_core::types::Position;

use crate::RegistryResult;

/// Body of an open feed connection, chunk by chunk
pub type FeedStream = Pin<Box<dyn Stream<Item = RegistryResult<Vec<u8>>> + Send>>;

/// HTTP client for the replication feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    feed_url: String,
    heartbeat: Duration,
}

impl FeedClient {
    /// Create a feed client.
    ///
    /// No overall request timeout is set because the response body stays open
    /// for as long as the feed is followed.
    pub fn new(feed_url: &str, user_agent: &str, heartbeat: Duration) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| VineError::network("Failed to create HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            feed_url: feed_url.to_string(),
            heartbeat,
        })
    }

    /// Create the client described by the follower configuration
    pub fn from_config(config: &FollowConfig) -> RegistryResult<Self> {
        Self::new(&config.feed_url, &config.user_agent, config.heartbeat())
    }

    /// Query parameters sent when resuming after `since`
    pub fn query(&self, since: Position) -> [(&'static str, String); 3] {
        [
            ("since", since.to_string()),
            ("feed", "continuous".to_string()),
            ("heartbeat", self.heartbeat.as_millis().to_string()),
        ]
    }

    /// Open the feed after `since`
    pub async fn open(&self, since: Position) -> RegistryResult<FeedStream> {
        info!(url = %self.feed_url, since = %since, "opening change feed");

        let response = self
            .client
            .get(&self.feed_url)
            .query(&self.query(since))
            .send()
            .await
            .map_err(|e| VineError::network(format!("Failed to open {}", self.feed_url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VineError::Network {
                message: format!("Change feed returned status {}", status),
                source: None,
            });
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| VineError::network("Change feed connection failed".to_string(), e))
        });

        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_query_parameters() {
        let client = FeedClient::new(
            "https://replicate.npmjs.com/registry/_changes",
            "vine-test",
            Duration::from_secs(30),
        )
        .unwrap();

        let query = client.query(Position::new(12657));
        assert_eq!(query[0], ("since", "12657".to_string()));
        assert_eq!(query[1], ("feed", "continuous".to_string()));
        assert_eq!(query[2], ("heartbeat", "30000".to_string()));
    }

    #[tokio::test]
    async fn test_open_streams_body() {
        let server = MockServer::start().await;
        let body = "{\"seq\":1,\"id\":\"a\"}\n{\"seq\":2,\"id\":\"b\"}\n";

        Mock::given(method("GET"))
            .and(path("/registry/_changes"))
            .and(query_param("since", "12657"))
            .and(query_param("feed", "continuous"))
            .and(query_param("heartbeat", "30000"))
            .and(header("User-Agent", "vine-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let feed_url = format!("{}/registry/_changes", server.uri());
        let client = FeedClient::new(&feed_url, "vine-test", Duration::from_secs(30)).unwrap();

        let mut stream = client.open(Position::new(12657)).await.unwrap();
        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.extend(chunk.unwrap());
        }

        assert_eq!(String::from_utf8(received).unwrap(), body);
    }

    #[tokio::test]
    async fn test_open_rejects_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = FeedClient::new(&server.uri(), "vine-test", Duration::from_secs(1)).unwrap();
        let err = client.open(Position::ZERO).await.err().unwrap();
        assert!(err.is_recoverable());
    }
}
