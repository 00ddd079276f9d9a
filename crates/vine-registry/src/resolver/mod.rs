//! Resolving change records into documents

use std::sync::Arc;

use tracing::debug;
use vine_config::FollowConfig;
use vine_core::error::VineError;
use vine_core::types::ChangeRecord;

use crate::api::DocumentError;
use crate::client::RegistryClient;
use crate::normalize::{Normalize, RegistryNormalizer};
use crate::split::ResolvedDocument;
use crate::RegistryResult;

/// Outcome of resolving one change
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedDocument),
    /// The registry no longer has the document
    NotFound,
}

/// Fetches, normalizes and splits the document behind a change
#[derive(Clone)]
pub struct DocumentResolver {
    client: RegistryClient,
    normalizer: Arc<dyn Normalize>,
}

impl DocumentResolver {
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            normalizer: Arc::new(RegistryNormalizer),
        }
    }

    pub fn from_config(config: &FollowConfig) -> RegistryResult<Self> {
        Ok(Self::new(RegistryClient::from_config(config)?))
    }

    /// Replace the default version-label normalizer
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalize>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub async fn resolve(&self, record: &ChangeRecord) -> RegistryResult<Resolution> {
        let mut document = match self.client.fetch_document(&record.subject_id).await {
            Ok(document) => document,
            Err(VineError::PackageNotFound { .. }) => {
                debug!(position = %record.position, subject = %record.subject_id, "document not found");
                return Ok(Resolution::NotFound);
            },
            Err(e) => return Err(e),
        };

        if let Some(err) = DocumentError::from_document(&document) {
            if err.is_not_found() {
                debug!(position = %record.position, subject = %record.subject_id, "document not found");
                return Ok(Resolution::NotFound);
            }

            return Err(VineError::Document {
                position: record.position,
                error: err.error,
                reason: err.reason.unwrap_or_default(),
            });
        }

        self.normalizer.normalize(&mut document);
        Ok(Resolution::Resolved(ResolvedDocument::from_document(
            record.position,
            &record.subject_id,
            document,
        )))
    }
}

impl std::fmt::Debug for DocumentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentResolver")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryConfig;
    use serde_json::{json, Value};
    use std::time::Duration;
    use vine_core::types::Position;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> DocumentResolver {
        let client = RegistryClient::new(&server.uri(), "vine-test")
            .unwrap()
            .with_retry_config(RetryConfig::fixed(1, Duration::ZERO));
        DocumentResolver::new(client)
    }

    async fn mount(server: &MockServer, name: &str, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{}", name)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_normalizes_and_splits() {
        let server = MockServer::start().await;
        mount(
            &server,
            "shelljs",
            200,
            json!({
                "name": "shelljs",
                "dist-tags": { "latest": "0.0.5pre4" },
                "versions": {
                    "0.0.5pre4": {
                        "version": "0.0.5pre4",
                        "dist": {
                            "tarball": "https://registry.npmjs.org/shelljs/-/shelljs-0.0.5pre4.tgz",
                            "shasum": "f00"
                        }
                    }
                }
            }),
        )
        .await;

        let record = ChangeRecord::new(Position::new(10), "shelljs");
        let Resolution::Resolved(doc) = resolver(&server).resolve(&record).await.unwrap() else {
            panic!("expected a resolved document");
        };

        assert_eq!(doc.name, "shelljs");
        assert_eq!(doc.position, Position::new(10));
        assert_eq!(doc.units.len(), 2);
        assert_eq!(doc.units[0].label, "latest");
        assert_eq!(doc.units[1].label, "0.0.5-pre4");
        assert_eq!(doc.assets[0].path, "/shelljs/-/shelljs-0.0.5pre4.tgz");
        assert!(doc.document["versions"].get("0.0.5-pre4").is_some());
    }

    #[tokio::test]
    async fn test_not_found_body_is_not_an_error() {
        let server = MockServer::start().await;
        mount(&server, "gone", 200, json!({"error": "not_found", "reason": "deleted"})).await;

        let record = ChangeRecord::new(Position::new(11), "gone");
        let resolution = resolver(&server).resolve(&record).await.unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_not_found_status_is_not_an_error() {
        let server = MockServer::start().await;
        mount(&server, "missing", 404, json!({"error": "not_found"})).await;

        let record = ChangeRecord::new(Position::new(12), "missing");
        let resolution = resolver(&server).resolve(&record).await.unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_other_document_error_is_terminal() {
        let server = MockServer::start().await;
        mount(&server, "secret", 200, json!({"error": "forbidden", "reason": "private"})).await;

        let record = ChangeRecord::new(Position::new(13), "secret");
        match resolver(&server).resolve(&record).await.unwrap_err() {
            VineError::Document { position, error, reason } => {
                assert_eq!(position, Position::new(13));
                assert_eq!(error, "forbidden");
                assert_eq!(reason, "private");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
