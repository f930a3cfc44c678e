//! Store module
//!
//! The store is where fetched records end up. Delivery is at-least-once,
//! so implementations must tolerate seeing the same record twice.
//!
//! # Overview
//!
//! - `RecordStore` - the store callback used by both executors
//! - `JsonlStore` - append-only JSON Lines files, partitioned by day
//! - `MemoryStore` - keeps batches in memory

mod jsonl;
mod memory;

pub use jsonl::{partition_path, sanitize_collection, JsonlStore};
pub use memory::{MemoryStore, StoredBatch};

use crate::error::Result;
use crate::types::Record;
use async_trait::async_trait;

/// Destination for fetched records
///
/// Called concurrently by every collector and by the stream executor;
/// the polling path holds the fetch gate for the duration of the call, so
/// implementations must not block indefinitely.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one batch of records
    async fn store(
        &self,
        records: &[Record],
        query_label: &str,
        collection: &str,
        skip_validation: bool,
    ) -> Result<()>;
}
