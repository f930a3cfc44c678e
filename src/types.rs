//! Common types used throughout cursor-harvester
//!
//! This module contains the record and query model shared by the
//! executors, the cursor strategies and the store.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Remote record identifier; larger is newer
pub type RecordId = u64;

// ============================================================================
// Record
// ============================================================================

/// One item returned by the remote API
///
/// The core only reads `id`; the payload is carried through to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique, monotonically comparable identifier
    pub id: RecordId,
    /// Raw payload as returned by the API
    pub payload: JsonValue,
}

impl Record {
    /// Create a record from an id and payload
    pub fn new(id: RecordId, payload: JsonValue) -> Self {
        Self { id, payload }
    }

    /// Build a record from a JSON object, reading `id` or `id_str`
    pub fn from_json(payload: JsonValue) -> Result<Self> {
        let id = payload
            .get("id")
            .and_then(JsonValue::as_u64)
            .or_else(|| {
                payload
                    .get("id_str")
                    .and_then(JsonValue::as_str)
                    .and_then(|s| s.parse().ok())
            })
            .ok_or_else(|| Error::MissingRecordId {
                message: truncate(&payload.to_string(), 120),
            })?;

        Ok(Self { id, payload })
    }
}

/// Highest id in a batch
pub fn max_id(records: &[Record]) -> Option<RecordId> {
    records.iter().map(|r| r.id).max()
}

/// Lowest id in a batch
pub fn min_id(records: &[Record]) -> Option<RecordId> {
    records.iter().map(|r| r.id).min()
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

// ============================================================================
// Query
// ============================================================================

/// Well-known query parameter names
pub mod params {
    /// Search term; doubles as the query label
    pub const QUERY: &str = "q";
    /// Per-call result limit
    pub const COUNT: &str = "count";
    /// Extended content flag
    pub const TWEET_MODE: &str = "tweet_mode";
    /// Forward cursor
    pub const SINCE_ID: &str = "since_id";
    /// Backward cursor
    pub const MAX_ID: &str = "max_id";
    /// Subject identifier for timeline queries
    pub const SCREEN_NAME: &str = "screen_name";
    /// Retweet inclusion flag
    pub const INCLUDE_RTS: &str = "include_rts";
}

/// A logical query against the remote API
///
/// Always carries a result limit and the extended content flag.
/// `since_id` and `max_id` are mutually exclusive: setting one clears the other.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Query {
    /// Create a query with the given per-call result limit
    pub fn new(count: u32) -> Self {
        let mut params = BTreeMap::new();
        params.insert(params::COUNT.to_string(), count.to_string());
        params.insert(params::TWEET_MODE.to_string(), "extended".to_string());
        Self { params }
    }

    /// Set the search term
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.params.insert(params::QUERY.to_string(), term.into());
        self
    }

    /// Set the retweet inclusion flag
    #[must_use]
    pub fn with_include_retweets(mut self, include: bool) -> Self {
        self.params
            .insert(params::INCLUDE_RTS.to_string(), include.to_string());
        self
    }

    /// Add an arbitrary static parameter
    ///
    /// Cursor fields go through [`Query::set_since_id`] / [`Query::set_max_id`]
    /// so the exclusivity invariant holds.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        match key.as_str() {
            params::SINCE_ID | params::MAX_ID => {
                if let Ok(id) = value.into().parse::<RecordId>() {
                    if key == params::SINCE_ID {
                        self.set_since_id(id);
                    } else {
                        self.set_max_id(id);
                    }
                }
            }
            _ => {
                self.params.insert(key, value.into());
            }
        }
        self
    }

    /// Set the forward cursor, clearing any backward cursor
    pub fn set_since_id(&mut self, id: RecordId) {
        self.params.remove(params::MAX_ID);
        self.params
            .insert(params::SINCE_ID.to_string(), id.to_string());
    }

    /// Set the backward cursor, clearing any forward cursor
    pub fn set_max_id(&mut self, id: RecordId) {
        self.params.remove(params::SINCE_ID);
        self.params.insert(params::MAX_ID.to_string(), id.to_string());
    }

    /// Attach a subject identifier
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.params
            .insert(params::SCREEN_NAME.to_string(), subject.into());
    }

    /// Forward cursor, if any
    pub fn since_id(&self) -> Option<RecordId> {
        self.get(params::SINCE_ID)?.parse().ok()
    }

    /// Backward cursor, if any
    pub fn max_id(&self) -> Option<RecordId> {
        self.get(params::MAX_ID)?.parse().ok()
    }

    /// Whether the query is bounded by either cursor field
    pub fn has_cursor(&self) -> bool {
        self.params.contains_key(params::SINCE_ID) || self.params.contains_key(params::MAX_ID)
    }

    /// Subject identifier, if any
    pub fn subject(&self) -> Option<&str> {
        self.get(params::SCREEN_NAME)
    }

    /// Search term, if any
    pub fn term(&self) -> Option<&str> {
        self.get(params::QUERY)
    }

    /// Per-call result limit
    pub fn count(&self) -> Option<u32> {
        self.get(params::COUNT)?.parse().ok()
    }

    /// Get a raw parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parameters in key order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Human-readable label used in logs and store calls
    pub fn label(&self) -> String {
        self.subject()
            .map(|s| format!("@{s}"))
            .or_else(|| self.term().map(ToString::to_string))
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.pairs().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

// ============================================================================
// Fetch Mode
// ============================================================================

/// Which remote operation a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Item search by term
    Search,
    /// One subject's timeline
    Timeline,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Search => write!(f, "search"),
            FetchMode::Timeline => write!(f, "timeline"),
        }
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Direction of a pagination bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Only records newer than the bound
    New,
    /// Only records older than the bound
    Past,
    /// No bound
    #[default]
    All,
}

// ============================================================================
// Destination
// ============================================================================

/// Where fetched records go: the store arguments a collector passes along
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Collection name in the store
    pub collection: String,
    /// Query label recorded with each batch
    pub label: String,
    /// Skip payload validation in the store
    pub skip_validation: bool,
}

impl Destination {
    /// Create a destination
    pub fn new(collection: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            label: label.into(),
            skip_validation: false,
        }
    }

    /// Set the skip-validation flag
    #[must_use]
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// Same destination with a different label
    #[must_use]
    pub fn relabel(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_defaults() {
        let query = Query::new(100);
        assert_eq!(query.count(), Some(100));
        assert_eq!(query.get(params::TWEET_MODE), Some("extended"));
        assert!(!query.has_cursor());
    }

    #[test]
    fn test_query_cursor_fields_are_exclusive() {
        let mut query = Query::new(100);
        query.set_since_id(10);
        assert_eq!(query.since_id(), Some(10));

        query.set_max_id(5);
        assert_eq!(query.max_id(), Some(5));
        assert_eq!(query.since_id(), None);

        let query = Query::new(100)
            .with_param("max_id", "7")
            .with_param("since_id", "3");
        assert_eq!(query.since_id(), Some(3));
        assert_eq!(query.max_id(), None);
    }

    #[test]
    fn test_query_label() {
        let query = Query::new(10).with_term("rust");
        assert_eq!(query.label(), "rust");

        let mut query = Query::new(10).with_term("rust");
        query.set_subject("ferris");
        assert_eq!(query.label(), "@ferris");

        assert_eq!(Query::new(10).label(), "<unnamed>");
    }

    #[test]
    fn test_query_display() {
        let query = Query::new(5).with_term("a");
        assert_eq!(query.to_string(), "{count=5, q=a, tweet_mode=extended}");
    }

    #[test]
    fn test_record_from_json() {
        let record = Record::from_json(json!({"id": 42, "text": "hi"})).unwrap();
        assert_eq!(record.id, 42);

        let record = Record::from_json(json!({"id_str": "9007199254740993"})).unwrap();
        assert_eq!(record.id, 9_007_199_254_740_993);

        assert!(Record::from_json(json!({"text": "no id"})).is_err());
    }

    #[test]
    fn test_min_max_id() {
        let records = vec![
            Record::new(5, json!({})),
            Record::new(9, json!({})),
            Record::new(7, json!({})),
        ];
        assert_eq!(max_id(&records), Some(9));
        assert_eq!(min_id(&records), Some(5));
        assert_eq!(max_id(&[]), None);
    }

    #[test]
    fn test_direction_serde() {
        let direction: Direction = serde_json::from_str("\"past\"").unwrap();
        assert_eq!(direction, Direction::Past);
        assert_eq!(Direction::default(), Direction::All);
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some(String::new()).none_if_empty(), None);
        assert_eq!(String::new().none_if_empty(), None);
    }
}
