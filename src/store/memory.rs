//! In-memory record store

use super::RecordStore;
use crate::error::{Error, Result};
use crate::types::Record;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One call to [`RecordStore::store`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBatch {
    /// Records in the batch
    pub records: Vec<Record>,
    /// Query label passed by the caller
    pub label: String,
    /// Collection name
    pub collection: String,
    /// Whether validation was skipped
    pub skip_validation: bool,
}

/// Store that keeps every batch in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: Mutex<Vec<StoredBatch>>,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All batches in call order
    pub fn batches(&self) -> Vec<StoredBatch> {
        self.lock().clone()
    }

    /// Number of store calls
    pub fn batch_count(&self) -> usize {
        self.lock().len()
    }

    /// Every record stored for `collection`
    pub fn records_in(&self, collection: &str) -> Vec<Record> {
        self.lock()
            .iter()
            .filter(|b| b.collection == collection)
            .flat_map(|b| b.records.iter().cloned())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredBatch>> {
        // A poisoned lock only means another caller panicked mid-push
        self.batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn store(
        &self,
        records: &[Record],
        query_label: &str,
        collection: &str,
        skip_validation: bool,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::store("memory store is set to fail"));
        }

        self.lock().push(StoredBatch {
            records: records.to_vec(),
            label: query_label.to_string(),
            collection: collection.to_string(),
            skip_validation,
        });
        Ok(())
    }
}
