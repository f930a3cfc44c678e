//! JSON Lines record store
//!
//! Appends one line per record under a Hive-style partitioned layout:
//! `{directory}/{collection}/dt={YYYY-MM-DD}/records.jsonl`.

use super::RecordStore;
use crate::error::{Error, Result};
use crate::types::Record;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("static regex"));

/// Make a collection name safe to use as a directory name
pub fn sanitize_collection(collection: &str) -> String {
    let sanitized = UNSAFE_CHARS.replace_all(collection.trim(), "_");
    let sanitized = sanitized.trim_matches('_');
    if sanitized.is_empty() {
        "default".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Build the partition file path for a collection on a given day
pub fn partition_path(directory: &Path, collection: &str, at: DateTime<Utc>) -> PathBuf {
    directory
        .join(sanitize_collection(collection))
        .join(format!("dt={}", at.format("%Y-%m-%d")))
        .join("records.jsonl")
}

/// Append-only JSON Lines store
#[derive(Debug)]
pub struct JsonlStore {
    directory: PathBuf,
    // Serializes appends so concurrent batches never interleave lines
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Create a store rooted at `directory`
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn render(records: &[Record], label: &str, skip_validation: bool) -> String {
        let collected_at = Utc::now().to_rfc3339();
        let mut out = String::new();

        for record in records {
            if !skip_validation && !record.payload.is_object() {
                warn!("Skipping record {}: payload is not a JSON object", record.id);
                continue;
            }
            let line = json!({
                "id": record.id,
                "label": label,
                "collected_at": collected_at,
                "record": record.payload,
            });
            out.push_str(&line.to_string());
            out.push('\n');
        }

        out
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn store(
        &self,
        records: &[Record],
        query_label: &str,
        collection: &str,
        skip_validation: bool,
    ) -> Result<()> {
        let body = Self::render(records, query_label, skip_validation);
        if body.is_empty() {
            return Ok(());
        }

        let path = partition_path(&self.directory, collection, Utc::now());
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::store(format!("Failed to create {}: {e}", parent.display())))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::store(format!("Failed to open {}: {e}", path.display())))?;

        file.write_all(body.as_bytes())
            .await
            .map_err(|e| Error::store(format!("Failed to write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| Error::store(format!("Failed to flush {}: {e}", path.display())))?;

        debug!(
            "Stored {} records for '{}' in {}",
            records.len(),
            query_label,
            path.display()
        );
        Ok(())
    }
}
