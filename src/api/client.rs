//! API client capability
//!
//! The collectors never talk HTTP directly; they go through [`ApiClient`],
//! one instance per credential.

use crate::error::Result;
use crate::types::{FetchMode, Query, Record, RecordId};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Type alias for the record stream returned by [`ApiClient::subscribe`]
///
/// The stream ends when the subscription disconnects. An `Err` item is a
/// termination signal; consumers close the subscription after it.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record>> + Send>>;

/// One authenticated identity's view of the remote API
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch one page of item-search results
    async fn search(&self, query: &Query) -> Result<Vec<Record>>;

    /// Fetch one page of a subject's timeline
    async fn timeline(&self, query: &Query) -> Result<Vec<Record>>;

    /// Look up a single record by id
    async fn lookup(&self, id: RecordId) -> Result<Record>;

    /// Open a push subscription filtered by `terms`
    async fn subscribe(&self, terms: &[String]) -> Result<RecordStream>;

    /// Fetch one page for the given mode
    async fn fetch_page(&self, mode: FetchMode, query: &Query) -> Result<Vec<Record>> {
        match mode {
            FetchMode::Search => self.search(query).await,
            FetchMode::Timeline => self.timeline(query).await,
        }
    }
}
