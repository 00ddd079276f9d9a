use super::*;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::checkpoint::MemoryCheckpointStore;
use crate::FollowItem;
use vine_config::FailurePolicy;

fn test_config(server: &MockServer) -> FollowConfig {
    FollowConfig {
        feed_url: format!("{}/registry/_changes", server.uri()),
        registry_url: server.uri(),
        user_agent: "vine-test".to_string(),
        concurrency: 5,
        inactivity_timeout_ms: 5_000,
        inactivity_backoff_ms: 50,
        metadata_retries: 1,
        metadata_retry_backoff_ms: 10,
        ..FollowConfig::default()
    }
}

fn build_follower(config: FollowConfig, store: Arc<MemoryCheckpointStore>) -> Follower {
    let source = Arc::new(FeedClient::from_config(&config).unwrap());
    let resolver = Arc::new(DocumentResolver::from_config(&config).unwrap());
    Follower::with_parts(config, store, source, resolver)
}

fn feed_body(positions: std::ops::RangeInclusive<u64>) -> String {
    positions
        .map(|p| format!("{{\"seq\":{},\"id\":\"pkg-{}\"}}\n", p, p))
        .collect()
}

async fn mount_feed(server: &MockServer, since: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/registry/_changes"))
        .and(query_param("since", since))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_documents(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/pkg-\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dist-tags": { "latest": "1.0.0" },
            "versions": {
                "1.0.0": {
                    "version": "1.0.0",
                    "dist": {
                        "tarball": "https://registry.npmjs.org/pkg/-/pkg-1.0.0.tgz",
                        "shasum": "abc"
                    }
                }
            }
        })))
        .mount(server)
        .await;
}

async fn requested_since(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/registry/_changes")
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "since")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

#[tokio::test]
async fn test_follow_resumes_after_completions() {
    let server = MockServer::start().await;
    mount_feed(&server, "0", feed_body(12658..=12677)).await;
    mount_documents(&server).await;

    let store = Arc::new(MemoryCheckpointStore::new());
    let follower = build_follower(test_config(&server), store.clone());
    let cancel = CancellationToken::new();
    let mut changes = follower.follow(cancel.clone());

    for expected in 12658..=12677u64 {
        let item = changes.next().await.unwrap().unwrap();
        let change = item.change.as_ref().unwrap();
        assert_eq!(item.position, Position::new(expected));
        assert_eq!(change.name, format!("pkg-{}", expected));
        assert_eq!(change.units.len(), 2);
        assert_eq!(change.assets.len(), 1);
        item.completion.done().await.unwrap();
    }
    assert_eq!(follower.read_checkpoint().await, Position::new(12677));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !requested_since(&server).await.iter().any(|since| since == "12677") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("follower did not reconnect from the checkpoint");

    cancel.cancel();
    assert!(changes.next().await.is_none());
    assert_eq!(store.value().as_deref(), Some("12677"));
    assert_eq!(requested_since(&server).await[0], "0");
}

#[tokio::test]
async fn test_missing_document_still_releases_position() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "0",
        "{\"seq\":1,\"id\":\"gone\"}\n{\"seq\":2,\"id\":\"pkg-2\"}\n".to_string(),
    )
    .await;
    mount_documents(&server).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not_found"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCheckpointStore::new());
    let follower = build_follower(test_config(&server), store.clone());
    let mut changes = follower.follow(CancellationToken::new());

    let items: Vec<FollowItem> = vec![
        changes.next().await.unwrap().unwrap(),
        changes.next().await.unwrap().unwrap(),
    ];
    assert!(items[0].change.is_none());
    assert!(items[1].change.is_some());

    for item in items {
        item.completion.done().await.unwrap();
    }
    assert_eq!(store.writes(), vec![Position::new(1), Position::new(2)]);
}

#[tokio::test]
async fn test_document_error_fails_fast() {
    let server = MockServer::start().await;
    mount_feed(&server, "0", "{\"seq\":1,\"id\":\"secret\"}\n".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "forbidden", "reason": "private"})),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCheckpointStore::new());
    let follower = build_follower(test_config(&server), store.clone());
    let mut changes = follower.follow(CancellationToken::new());

    let err = changes.next().await.unwrap().unwrap_err();
    assert!(err.to_string().contains("forbidden"));
    assert!(changes.next().await.is_none());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_document_error_skipped() {
    let server = MockServer::start().await;
    mount_feed(&server, "0", "{\"seq\":1,\"id\":\"secret\"}\n".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "forbidden"})))
        .mount(&server)
        .await;

    let config = FollowConfig {
        failure_policy: FailurePolicy::Skip,
        ..test_config(&server)
    };
    let follower = build_follower(config, Arc::new(MemoryCheckpointStore::new()));
    let mut changes = follower.follow(CancellationToken::new());

    let item = changes.next().await.unwrap().unwrap();
    assert!(item.change.is_none());
    assert_eq!(item.completion.done().await.unwrap(), Some(Position::new(1)));
}

#[tokio::test]
async fn test_checkpoint_operations() {
    let server = MockServer::start().await;

    let store = Arc::new(MemoryCheckpointStore::with_value("42"));
    let follower = build_follower(test_config(&server), store.clone());
    assert_eq!(follower.read_checkpoint().await, Position::new(42));

    follower.reset_checkpoint().await.unwrap();
    assert_eq!(store.value(), None);
    assert_eq!(follower.read_checkpoint().await, Position::ZERO);

    let config = FollowConfig {
        since: Some(Position::new(7)),
        ..test_config(&server)
    };
    let follower = build_follower(config, Arc::new(MemoryCheckpointStore::with_value("42")));
    assert_eq!(follower.read_checkpoint().await, Position::new(7));
}
