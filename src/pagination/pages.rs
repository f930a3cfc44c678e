//! Id-bounded page walking
//!
//! Pages are chained by moving the backward cursor below the oldest record
//! of the previous page (`max_id = min(id) - 1`). The walk ends when the
//! API returns an empty page.

use crate::api::ApiClient;
use crate::error::Result;
use crate::types::{min_id, FetchMode, Query, Record};
use futures::{Stream, StreamExt};
use std::pin::pin;
use tracing::debug;

/// Query for the page after `page`, or `None` when nothing older can exist
pub fn next_page_query(query: &Query, page: &[Record]) -> Option<Query> {
    let oldest = min_id(page)?;
    if oldest == 0 {
        return None;
    }
    let mut next = query.clone();
    next.set_max_id(oldest - 1);
    Some(next)
}

/// Lazy sequence of pages starting at `query`
///
/// Yields every non-empty page; an error is yielded once and ends the
/// sequence.
pub fn pages(
    client: &dyn ApiClient,
    mode: FetchMode,
    query: Query,
) -> impl Stream<Item = Result<Vec<Record>>> + Send + '_ {
    futures::stream::unfold(Some(query), move |next| async move {
        let query = next?;
        match client.fetch_page(mode, &query).await {
            Ok(page) if page.is_empty() => None,
            Ok(page) => {
                let next = next_page_query(&query, &page);
                Some((Ok(page), next))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Walk pages until `target` records are collected (0 = no limit)
///
/// The result is truncated to `target`.
pub async fn collect_pages(
    client: &dyn ApiClient,
    mode: FetchMode,
    query: Query,
    target: usize,
) -> Result<Vec<Record>> {
    let mut collected = Vec::new();
    let mut page_count = 0;
    let mut stream = pin!(pages(client, mode, query));

    while target == 0 || collected.len() < target {
        let Some(page) = stream.next().await else {
            break;
        };
        let page = page?;
        page_count += 1;
        debug!("Page {page_count}: fetched {} records", page.len());
        collected.extend(page);
    }

    if target > 0 {
        collected.truncate(target);
    }
    Ok(collected)
}
