//! Tests for the API client module

use super::http::{decode_records, decode_stream, decode_stream_line};
use super::*;
use crate::error::{Error, ErrorClass};
use crate::types::{FetchMode, Query};
use bytes::Bytes;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpApiClient {
    let config = HttpApiConfig::new(server.uri())
        .with_stream_url(format!("{}/stream/filter.json", server.uri()));
    HttpApiClient::new(config, "test-token").unwrap()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_http_api_config_default() {
    let config = HttpApiConfig::default();
    assert_eq!(config.search_path, "search/tweets.json");
    assert_eq!(config.search_records_field.as_deref(), Some("statuses"));
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert!(config.stream_url.is_none());
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_relative_base_url_is_invalid() {
    let err = HttpApiClient::new(HttpApiConfig::new("api/1.1"), "token").unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test]
fn test_http_api_config_yaml() {
    let config: HttpApiConfig = serde_yaml::from_str(
        r"
base_url: https://example.com/api
search_records_field: null
rate_limit:
  requests: 450
",
    )
    .unwrap();

    assert_eq!(config.base_url, "https://example.com/api");
    assert!(config.search_records_field.is_none());
    assert_eq!(config.timeline_path, "statuses/user_timeline.json");
    assert_eq!(config.rate_limit.unwrap().window_seconds, 900);
}

// ============================================================================
// Decoding Tests
// ============================================================================

#[test]
fn test_decode_records_with_field() {
    let body = json!({"statuses": [{"id": 1}, {"id": 2}], "search_metadata": {}});
    let records = decode_records(body, Some("statuses")).unwrap();
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_decode_records_bare_array() {
    let records = decode_records(json!([{"id": 3}]), None).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_decode_records_skips_items_without_id() {
    let body = json!({"statuses": [{"id": 1}, {"text": "no id here"}, {"id_str": "3"}]});
    let records = decode_records(body, Some("statuses")).unwrap();
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn test_decode_records_rejects_non_array() {
    let err = decode_records(json!({"statuses": {}}), Some("statuses")).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(err.class(), ErrorClass::Local);

    let err = decode_records(json!({"other": []}), Some("statuses")).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_decode_stream_line() {
    assert!(decode_stream_line("").is_none());
    assert!(decode_stream_line("\r\n").is_none());
    assert!(decode_stream_line(r#"{"limit": {"track": 10}}"#).is_none());

    let record = decode_stream_line(r#"{"id": 77, "text": "hello"}"#)
        .unwrap()
        .unwrap();
    assert_eq!(record.id, 77);

    let err = decode_stream_line(r#"{"errors": [{"code": 420, "message": "slow down"}]}"#)
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { code: 420, .. }));

    let err = decode_stream_line(r#"{"disconnect": {"code": 7, "reason": "admin"}}"#)
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::StreamTerminated { .. }));

    let err = decode_stream_line("{not json").unwrap().unwrap_err();
    assert!(matches!(err, Error::JsonParse(_)));
}

#[tokio::test]
async fn test_decode_stream_splits_chunks() {
    let chunks: Vec<reqwest::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"{\"id\": 1}\r\n\r\n{\"id\"")),
        Ok(Bytes::from_static(b": 2}\r\n")),
        Ok(Bytes::from_static(b"{\"id\": 3}")),
    ];

    let ids: Vec<u64> = decode_stream(futures::stream::iter(chunks))
        .map(|item| item.unwrap().id)
        .collect()
        .await;

    assert_eq!(ids, vec![1, 2, 3]);
}

// ============================================================================
// HTTP Tests
// ============================================================================

#[tokio::test]
async fn test_search_sends_query_and_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tweets.json"))
        .and(query_param("q", "rust"))
        .and(query_param("since_id", "101"))
        .and(query_param("tweet_mode", "extended"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [{"id": 105, "full_text": "a"}, {"id": 102, "full_text": "b"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut query = Query::new(100).with_term("rust");
    query.set_since_id(101);

    let records = client.fetch_page(FetchMode::Search, &query).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].payload["full_text"], "a");
}

#[tokio::test]
async fn test_timeline_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"code": 34, "message": "Sorry, that page does not exist."}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut query = Query::new(100);
    query.set_subject("ghost");

    let err = client.timeline(&query).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn test_rate_limited_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tweets.json"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "120")
                .set_body_json(json!({"errors": [{"code": 88, "message": "Rate limit exceeded"}]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.search(&Query::new(10)).await.unwrap_err();

    match err {
        Error::RateLimited {
            code,
            retry_after_seconds,
        } => {
            assert_eq!(code, 88);
            assert_eq!(retry_after_seconds, 120);
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_code_88_on_other_status_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tweets.json"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"errors": [{"code": 88, "message": "Rate limit exceeded"}]})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&Query::new(10))
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tweets.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&Query::new(10))
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "over capacity");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/statuses/show.json"))
        .and(query_param("id", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 20, "text": "just setting up"})))
        .mount(&server)
        .await;

    let record = client_for(&server).lookup(20).await.unwrap();
    assert_eq!(record.id, 20);
}

#[tokio::test]
async fn test_subscribe_yields_records_until_body_ends() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream/filter.json"))
        .and(query_param("track", "rust,tokio"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"id\": 1}\r\n\r\n{\"id\": 2}\r\n"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let terms = vec!["rust".to_string(), "tokio".to_string()];
    let stream = client.subscribe(&terms).await.unwrap();

    let ids: Vec<u64> = stream.map(|item| item.unwrap().id).collect().await;
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_subscribe_420_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream/filter.json"))
        .respond_with(ResponseTemplate::new(420))
        .mount(&server)
        .await;

    let result = client_for(&server).subscribe(&["x".to_string()]).await;
    assert!(matches!(
        result,
        Err(Error::RateLimited {
            code: STREAM_RATE_LIMIT_CODE,
            ..
        })
    ));
}

#[tokio::test]
async fn test_subscribe_without_stream_url() {
    let client = HttpApiClient::new(HttpApiConfig::default(), "t").unwrap();
    let result = client.subscribe(&["x".to_string()]).await;
    assert!(matches!(result, Err(Error::Config { .. })));
}
