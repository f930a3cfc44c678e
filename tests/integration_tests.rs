//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML config → HTTP requests → JSON Lines output

use cursor_harvester::api::{ApiClient, HttpApiClient, HttpApiConfig};
use cursor_harvester::collector::{Collector, PollingCollector, Termination};
use cursor_harvester::config::{build_scheduler, load_config_from_str};
use cursor_harvester::credentials::{Credential, CredentialPool};
use cursor_harvester::cursor::{BackfillCursor, NewCursor, Progress};
use cursor_harvester::fetch::FetchExecutor;
use cursor_harvester::scheduler::ExitReason;
use cursor_harvester::state::StateManager;
use cursor_harvester::store::{partition_path, JsonlStore, MemoryStore};
use cursor_harvester::stream::StreamExecutor;
use cursor_harvester::{Destination, Error, FetchMode, Query};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH: &str = "/1.1/search/tweets.json";

fn api_config(server: &MockServer) -> HttpApiConfig {
    HttpApiConfig::new(format!("{}/1.1", server.uri()))
}

fn credential(server: &MockServer, name: &str, token: &str) -> Credential {
    let client = HttpApiClient::new(api_config(server), token).unwrap();
    Credential::polling(name, Arc::new(client))
}

fn statuses(ids: &[u64]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "full_text": format!("status {id}")}))
        .collect();
    json!({ "statuses": items })
}

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ============================================================================
// Polling Integration Tests
// ============================================================================

#[tokio::test]
async fn test_backfill_collector_runs_to_exhaustion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("max_id", "99"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statuses(&[90, 80])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("max_id", "79"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statuses(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path().join("data")));
    let state = StateManager::new(dir.path().join("state.json"));
    let pool = CredentialPool::new(vec![credential(&server, "app", "token")]).unwrap();
    let executor = Arc::new(FetchExecutor::new(pool, store));

    let mut collector = PollingCollector::new(
        "rust-past",
        BackfillCursor::new(Some(100)),
        executor.clone(),
        Query::new(100).with_term("rust"),
        Destination::new("rust", "rust"),
    )
    .with_interval(Duration::from_millis(1))
    .with_state(state);

    let (_tx, rx) = watch::channel(false);
    assert_eq!(collector.run(rx).await, Termination::Exhausted);
    assert_eq!(collector.strategy().cursor(), Some(80));
    assert_eq!(executor.stats().records, 2);

    let lines = read_lines(&partition_path(&dir.path().join("data"), "rust", Utc::now()));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 90);
    assert_eq!(lines[0]["label"], "rust");
    assert_eq!(lines[1]["record"]["full_text"], "status 80");

    let reloaded = StateManager::from_file(dir.path().join("state.json")).unwrap();
    let snapshot = reloaded.collector("rust-past").await.unwrap();
    assert!(snapshot.exhausted);
    assert_eq!(snapshot.cursor, Some(80));
}

#[tokio::test]
async fn test_rate_limited_credential_rotates_to_next() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("Authorization", "Bearer spent"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "900")
                .set_body_json(json!({"errors": [{"code": 88, "message": "Rate limit exceeded"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("Authorization", "Bearer fresh"))
        .and(query_param("since_id", "501"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statuses(&[700, 650])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let pool = CredentialPool::new(vec![
        credential(&server, "spent", "spent"),
        credential(&server, "fresh", "fresh"),
    ])
    .unwrap();
    let executor = Arc::new(FetchExecutor::new(pool, store.clone()));

    let mut collector = PollingCollector::new(
        "rust-new",
        NewCursor::new(Some(500)),
        executor.clone(),
        Query::new(100).with_term("rust"),
        Destination::new("rust", "rust"),
    );

    assert_eq!(collector.cycle().await.unwrap(), Progress::Advanced);
    assert_eq!(collector.strategy().cursor(), Some(700));
    assert_eq!(executor.current_credential().await, "fresh");
    assert_eq!(executor.stats().rotations, 1);
    assert_eq!(executor.stats().cooldowns, 0);
    assert_eq!(store.records_in("rust").len(), 2);
}

#[tokio::test]
async fn test_missing_subject_is_invalid_target() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .and(query_param("screen_name", "ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let pool = CredentialPool::new(vec![credential(&server, "app", "token")]).unwrap();
    let executor = FetchExecutor::new(pool, Arc::new(MemoryStore::new()));

    let mut query = Query::new(200);
    query.set_subject("ghost");
    query.set_since_id(10);

    let err = executor
        .execute(&query, FetchMode::Timeline, &Destination::new("people", "people"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidTarget { .. }));
    assert_eq!(executor.stats().invalid_targets, 1);
}

#[tokio::test]
async fn test_lookup_single_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/show.json"))
        .and(query_param("id", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id_str": "20", "full_text": "just setting up"})))
        .mount(&server)
        .await;

    let client = HttpApiClient::new(api_config(&server), "token").unwrap();
    let record = client.lookup(20).await.unwrap();
    assert_eq!(record.id, 20);
}

// ============================================================================
// Streaming Integration Tests
// ============================================================================

#[tokio::test]
async fn test_stream_stores_records_until_disconnect() {
    let server = MockServer::start().await;

    let body = concat!(
        "{\"id\": 1, \"text\": \"one\"}\r\n",
        "\r\n",
        "{\"limit\": {\"track\": 3}}\r\n",
        "{\"id\": 2, \"text\": \"two\"}\r\n",
        "{\"disconnect\": {\"code\": 7, \"reason\": \"admin logout\"}}\r\n",
    );
    Mock::given(method("GET"))
        .and(path("/filter.json"))
        .and(query_param("track", "rust,tokio"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let config = api_config(&server).with_stream_url(format!("{}/filter.json", server.uri()));
    let client = HttpApiClient::new(config, "token").unwrap();
    let pool = CredentialPool::new(vec![Credential::streaming("live", Arc::new(client))]).unwrap();
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(
        StreamExecutor::new(pool, store.clone()).with_interval(Duration::from_secs(3600)),
    );

    let (tx, mut rx) = watch::channel(false);
    let terms = vec!["rust".to_string(), "tokio".to_string()];
    let destination = Destination::new("live", "rust,tokio");
    let running = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.stream(&terms, &destination, &mut rx).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while executor.stats().rounds == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    tx.send_replace(true);

    running.await.unwrap().unwrap();
    let ids: Vec<u64> = store.records_in("live").iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(executor.stats().subscriptions, 1);
}

// ============================================================================
// Config Integration Tests
// ============================================================================

#[tokio::test]
async fn test_config_driven_scheduler() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("max_id", "41"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statuses(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        r#"
api:
  base_url: {}/1.1
store:
  directory: {}
credentials:
  polling:
    - name: app
      token: token
collectors:
  - name: rust-past
    kind: past
    query: rust
    cursor: 42
    params:
      lang: en
"#,
        server.uri(),
        dir.path().join("data").display()
    );
    let config = load_config_from_str(&yaml).unwrap();
    let state = StateManager::new(dir.path().join("state.json"));
    let store = Arc::new(JsonlStore::new(&config.store.directory));
    let (_tx, rx) = watch::channel(false);

    let scheduler = build_scheduler(&config, store, Some(&state), rx.clone())
        .await
        .unwrap();
    let exits = scheduler.run(rx).await;

    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].name, "rust-past");
    assert_eq!(exits[0].reason, ExitReason::Finished(Termination::Exhausted));
    assert!(state.is_exhausted("rust-past").await);
}
