//! JSON-over-HTTP API client
//!
//! A generic [`ApiClient`] for REST APIs shaped like the classic
//! search/timeline endpoints:
//! - bearer token authentication
//! - `404` means the subject does not exist
//! - `429` (or an error body with code 88) means rate limited
//! - streaming endpoint delivers newline-delimited JSON

use super::client::{ApiClient, RecordStream};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Query, Record, RecordId};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Error code the remote uses for "rate limit exceeded"
pub const RATE_LIMIT_CODE: u32 = 88;

/// Error code the streaming endpoint uses when a client connects too often
pub const STREAM_RATE_LIMIT_CODE: u32 = 420;

/// Configuration for [`HttpApiClient`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpApiConfig {
    /// Base URL for REST endpoints
    pub base_url: String,
    /// Item search endpoint, relative to `base_url`
    pub search_path: String,
    /// Subject timeline endpoint, relative to `base_url`
    pub timeline_path: String,
    /// Single record lookup endpoint, relative to `base_url` (takes `id`)
    pub lookup_path: String,
    /// Absolute URL of the streaming endpoint
    pub stream_url: Option<String>,
    /// Field holding the record array in search responses
    pub search_records_field: Option<String>,
    /// Request timeout in seconds (not applied to subscriptions)
    pub timeout_seconds: u64,
    /// Client-side pacing
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com/1.1".to_string(),
            search_path: "search/tweets.json".to_string(),
            timeline_path: "statuses/user_timeline.json".to_string(),
            lookup_path: "statuses/show.json".to_string(),
            stream_url: None,
            search_records_field: Some("statuses".to_string()),
            timeout_seconds: 30,
            rate_limit: None,
            user_agent: format!("cursor-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpApiConfig {
    /// Create a config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the streaming endpoint
    #[must_use]
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// Set the search records field (`None` when the body is a bare array)
    #[must_use]
    pub fn with_search_records_field(mut self, field: Option<String>) -> Self {
        self.search_records_field = field;
        self
    }

    /// Set client-side pacing
    #[must_use]
    pub fn with_rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// HTTP client for one credential
pub struct HttpApiClient {
    client: Client,
    config: HttpApiConfig,
    base_url: Url,
    token: String,
    rate_limiter: Option<RateLimiter>,
}

impl HttpApiClient {
    /// Create a client authenticating with `token`
    pub fn new(config: HttpApiConfig, token: impl Into<String>) -> Result<Self> {
        // No client-wide timeout: it would cut subscriptions off
        let client = Client::builder().user_agent(&config.user_agent).build()?;

        // Ensure relative endpoint paths join below the base path
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            base_url,
            token: token.into(),
            rate_limiter,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<JsonValue> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let url = self.endpoint(path)?;
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .timeout(self.config.timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_records(
        &self,
        path: &str,
        query: &Query,
        field: Option<&str>,
    ) -> Result<Vec<Record>> {
        let pairs: Vec<(&str, &str)> = query.pairs().collect();
        let body = self.get_json(path, &pairs).await?;
        decode_records(body, field)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn search(&self, query: &Query) -> Result<Vec<Record>> {
        let field = self.config.search_records_field.as_deref();
        self.get_records(&self.config.search_path, query, field).await
    }

    async fn timeline(&self, query: &Query) -> Result<Vec<Record>> {
        self.get_records(&self.config.timeline_path, query, None)
            .await
    }

    async fn lookup(&self, id: RecordId) -> Result<Record> {
        let id = id.to_string();
        let body = self
            .get_json(
                &self.config.lookup_path,
                &[("id", id.as_str()), ("tweet_mode", "extended")],
            )
            .await?;
        Record::from_json(body)
    }

    async fn subscribe(&self, terms: &[String]) -> Result<RecordStream> {
        let url = self
            .config
            .stream_url
            .as_deref()
            .ok_or_else(|| Error::config("no stream_url configured for this client"))?;

        debug!("Opening subscription {} track={:?}", url, terms);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("track", terms.join(","))])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 420 {
            return Err(Error::rate_limited(
                STREAM_RATE_LIMIT_CODE,
                extract_retry_after(&response),
            ));
        }
        if !status.is_success() {
            return Err(classify_failure(response).await);
        }

        Ok(Box::pin(decode_stream(response.bytes_stream())))
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Response decoding
// ============================================================================

/// Turn a failed response into the matching error variant
async fn classify_failure(response: Response) -> Error {
    let status = response.status();
    let retry_after = extract_retry_after(&response);
    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let code = api_error_code(&body);

    match status {
        StatusCode::NOT_FOUND => Error::not_found(path),
        StatusCode::TOO_MANY_REQUESTS => {
            Error::rate_limited(code.unwrap_or(RATE_LIMIT_CODE), retry_after)
        }
        _ if code == Some(RATE_LIMIT_CODE) => Error::rate_limited(RATE_LIMIT_CODE, retry_after),
        _ => Error::api(status.as_u16(), body),
    }
}

/// First error code in an `{"errors": [{"code": N}]}` body
fn api_error_code(body: &str) -> Option<u32> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    value
        .get("errors")?
        .get(0)?
        .get("code")?
        .as_u64()
        .map(|c| c as u32)
}

/// Extract retry-after header value
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Decode a page body into records
///
/// Items without a usable id are skipped with a warning. Only a body that is
/// not a list of items fails the page.
pub(crate) fn decode_records(body: JsonValue, field: Option<&str>) -> Result<Vec<Record>> {
    let items = match (field, body) {
        (Some(field), JsonValue::Object(mut map)) => map
            .remove(field)
            .ok_or_else(|| Error::decode(format!("response has no '{field}' field")))?,
        (_, body) => body,
    };

    let JsonValue::Array(items) = items else {
        return Err(Error::decode("expected an array of records"));
    };

    let records = items
        .into_iter()
        .filter_map(|item| match Record::from_json(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping record: {e}");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Decode one line of a streaming body
///
/// Returns `None` for keep-alives and notices that carry no record.
pub(crate) fn decode_stream_line(line: &str) -> Option<Result<Record>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: JsonValue = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return Some(Err(Error::JsonParse(e))),
    };

    if value.get("id").is_some() || value.get("id_str").is_some() {
        return Some(Record::from_json(value));
    }

    if let Some(disconnect) = value.get("disconnect") {
        let reason = disconnect
            .get("reason")
            .and_then(JsonValue::as_str)
            .unwrap_or("disconnected by server");
        return Some(Err(Error::stream_terminated("remote", reason)));
    }

    if let Some(error) = value.get("errors").and_then(|e| e.get(0)) {
        let code = error.get("code").and_then(JsonValue::as_u64).unwrap_or(0) as u32;
        if code == RATE_LIMIT_CODE || code == STREAM_RATE_LIMIT_CODE {
            return Some(Err(Error::rate_limited(code, 0)));
        }
        let message = error
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        return Some(Err(Error::api(code as u16, message)));
    }

    debug!("Ignoring stream notice: {}", line);
    None
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct LineState {
    inner: ByteStream,
    buffer: BytesMut,
    done: bool,
}

impl LineState {
    /// Pop the next complete line, or the remainder once the body ended
    fn next_line(&mut self) -> Option<String> {
        if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
        if self.done && !self.buffer.is_empty() {
            let rest = self.buffer.split();
            return Some(String::from_utf8_lossy(&rest).into_owned());
        }
        None
    }
}

/// Turn a chunked body of newline-delimited JSON into a record stream
pub(crate) fn decode_stream<S>(bytes: S) -> impl Stream<Item = Result<Record>> + Send
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let state = LineState {
        inner: Box::pin(bytes),
        buffer: BytesMut::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            while let Some(line) = state.next_line() {
                if let Some(item) = decode_stream_line(&line) {
                    return Some((item, state));
                }
            }

            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.done = true;
                    state.buffer.clear();
                    return Some((Err(Error::Http(e)), state));
                }
                None => state.done = true,
            }
        }
    })
}
