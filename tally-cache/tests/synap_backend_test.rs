//! Cache over the Synap backend
//!
//! Mock tests run by default. S2S tests require a running Synap server:
//! SYNAP_URL=http://localhost:15500 cargo test --test synap_backend_test -- --ignored

mod common;

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use tally_cache::{Cache, SynapBackend, TallyConfig, TallyError};

/// Mock server that accepts the initial flush, and a cache created against it
///
/// The history lists do not exist yet, so trimming them reports "Not found".
async fn setup_mock_cache() -> (Cache, ServerGuard, Vec<Mock>) {
    let mut server = Server::new_async().await;
    let flush = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({"command": "kv.flushall"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true, "payload": {"flushed": 3}}"#)
        .create_async()
        .await;
    let trim = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({"command": "list.ltrim"})))
        .with_status(200)
        .with_body(r#"{"success": false, "error": "Not found"}"#)
        .expect(2)
        .create_async()
        .await;

    let config = TallyConfig::default().with_url(server.url());
    let cache = Cache::from_config(&config).await.unwrap();
    (cache, server, vec![flush, trim])
}

#[tokio::test]
async fn test_store_issues_incr_push_set_push() {
    let (cache, mut server, _setup) = setup_mock_cache().await;

    let incr = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "kv.incr",
            "payload": {"key": "Cache.store"}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": {"value": 1}}"#)
        .expect(1)
        .create_async()
        .await;

    let inputs = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "list.rpush",
            "payload": {"key": "Cache.store:inputs", "values": ["(\"a\",)"]}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": {"length": 1}}"#)
        .expect(1)
        .create_async()
        .await;

    let set = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "kv.set",
            "payload": {"value": "YQ=="}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": {"success": true}}"#)
        .expect(1)
        .create_async()
        .await;

    let outputs = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "list.rpush",
            "payload": {"key": "Cache.store:outputs"}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": {"length": 1}}"#)
        .expect(1)
        .create_async()
        .await;

    let key = cache.store("a").await.unwrap();
    assert!(uuid::Uuid::parse_str(&key).is_ok());

    incr.assert_async().await;
    inputs.assert_async().await;
    set.assert_async().await;
    outputs.assert_async().await;
}

#[tokio::test]
async fn test_retrieve_decodes_base64_value() {
    let (cache, mut server, _setup) = setup_mock_cache().await;

    // "aGVsbG8=" is base64 of "hello"; kv.get returns the stored JSON text
    let get = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "kv.get",
            "payload": {"key": "k1"}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": "\"aGVsbG8=\""}"#)
        .create_async()
        .await;

    assert_eq!(
        cache.retrieve_string("k1").await.unwrap(),
        Some("hello".to_string())
    );
    get.assert_async().await;
}

#[tokio::test]
async fn test_replay_reads_counter_and_lists() {
    let (cache, mut server, setup) = setup_mock_cache().await;
    for mock in &setup {
        mock.assert_async().await;
    }

    let _counter = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({"command": "kv.get"})))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": "2"}"#)
        .create_async()
        .await;
    let _inputs = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "list.lrange",
            "payload": {"key": "Cache.store:inputs", "start": 0, "stop": -1}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": {"values": ["(\"a\",)", "(3,)"]}}"#)
        .create_async()
        .await;
    let _outputs = server
        .mock("POST", "/api/v1/command")
        .match_body(Matcher::PartialJson(json!({
            "command": "list.lrange",
            "payload": {"key": "Cache.store:outputs"}
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "payload": {"values": ["key-1", "key-2"]}}"#)
        .create_async()
        .await;

    let log = cache.replay(&Cache::STORE).await.unwrap();
    assert_eq!(
        log.lines(),
        vec![
            "Cache.store was called 2 times:",
            "Cache.store(*(\"a\",)) -> key-1",
            "Cache.store(*(3,)) -> key-2",
        ]
    );
}

#[tokio::test]
async fn test_unreachable_backend_fails_initialization() {
    let config = TallyConfig::default().with_url("http://127.0.0.1:1");
    let result = Cache::from_config(&config).await;
    assert!(matches!(result, Err(TallyError::Connection(_))));
}

#[tokio::test]
#[ignore = "requires running Synap server"]
async fn test_s2s_store_retrieve_replay() {
    let cache = Cache::new(Arc::new(common::setup_s2s_backend()))
        .await
        .unwrap();

    let text = cache.store("a").await.unwrap();
    let number = cache.store(3).await.unwrap();
    let blob = cache.store(vec![0u8, 159, 146, 150]).await.unwrap();

    assert_eq!(cache.retrieve_string(&text).await.unwrap(), Some("a".to_string()));
    assert_eq!(cache.retrieve_integer(&number).await.unwrap(), Some(3));
    assert_eq!(
        cache.retrieve(&blob).await.unwrap(),
        Some(vec![0u8, 159, 146, 150])
    );
    assert_eq!(cache.retrieve("missing-key").await.unwrap(), None);

    let log = cache.replay(&Cache::STORE).await.unwrap();
    assert_eq!(log.calls, 3);
    assert_eq!(log.entries[0].input, "(\"a\",)");
    assert_eq!(log.entries[0].output, text);
    assert_eq!(log.entries[1].input, "(3,)");
}

#[tokio::test]
#[ignore = "requires running Synap server"]
async fn test_s2s_reinitialization_resets_history() {
    let backend: Arc<SynapBackend> = Arc::new(common::setup_s2s_backend());

    let cache = Cache::new(backend.clone()).await.unwrap();
    cache.store("before").await.unwrap();

    let fresh = Cache::new(backend).await.unwrap();
    let log = fresh.replay(&Cache::STORE).await.unwrap();
    assert_eq!(log.calls, 0);
    assert!(log.entries.is_empty());
}
