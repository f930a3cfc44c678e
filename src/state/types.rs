//! State types for tracking collector progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::cursor::CursorSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Checkpointed state of every collector in a process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-collector cursor snapshots, keyed by collector name
    #[serde(default)]
    pub collectors: BTreeMap<String, CursorSnapshot>,

    /// When any snapshot last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for a collector
    pub fn collector(&self, name: &str) -> Option<&CursorSnapshot> {
        self.collectors.get(name)
    }

    /// Replace the snapshot for a collector
    pub fn set_collector(&mut self, name: &str, snapshot: CursorSnapshot) {
        self.collectors.insert(name.to_string(), snapshot);
        self.updated_at = Some(Utc::now());
    }

    /// Forget a collector
    pub fn remove_collector(&mut self, name: &str) -> Option<CursorSnapshot> {
        self.collectors.remove(name)
    }

    /// Whether a collector was checkpointed as finished
    pub fn is_exhausted(&self, name: &str) -> bool {
        self.collectors.get(name).is_some_and(|s| s.exhausted)
    }
}
