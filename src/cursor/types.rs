//! Cursor strategy types

use crate::error::{Error, Result};
use crate::types::{Destination, FetchMode, Query, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Outcome of one cycle as seen by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Records arrived and the cursor moved
    Advanced,
    /// Nothing new; try again after an extra interval
    Idle,
    /// A subject was dropped; continue without waiting
    TargetDropped,
    /// Nothing left to collect; the collector stops for good
    Exhausted,
}

impl Progress {
    /// Whether the collector should stop
    pub fn is_terminal(self) -> bool {
        self == Progress::Exhausted
    }
}

/// Serializable view of a strategy's cursor state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    /// Boundary id observed so far (newest for forward, oldest for backward)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<RecordId>,

    /// Remaining subjects (rotation only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,

    /// Next subject index (rotation only)
    #[serde(default)]
    pub index: usize,

    /// The collector has terminated permanently
    #[serde(default)]
    pub exhausted: bool,
}

impl CursorSnapshot {
    /// Snapshot holding only a cursor
    pub fn with_cursor(cursor: Option<RecordId>) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }
}

/// Pluggable cursor logic driven by a polling collector
///
/// A strategy owns the cursor state of one collector. The driver calls
/// `derive_query` before each fetch and `advance` (or `on_invalid_target`)
/// with its outcome.
pub trait CursorStrategy: Send + Sync {
    /// Short name of the strategy, used in logs
    fn kind(&self) -> &'static str;

    /// Which API operation the strategy queries
    fn mode(&self) -> FetchMode;

    /// Build the next query from `base`, or `None` when nothing is left
    fn derive_query(&mut self, base: &Query) -> Option<Query>;

    /// Update the cursor from a successful fetch
    fn advance(&mut self, records: &[Record]) -> Progress;

    /// React to the executor rejecting the last target
    fn on_invalid_target(&mut self, err: Error) -> Result<Progress> {
        Err(err)
    }

    /// Store arguments for the next fetch
    fn destination(&self, base: &Destination) -> Destination {
        base.clone()
    }

    /// Current state for checkpointing
    fn snapshot(&self) -> CursorSnapshot;

    /// Resume from a checkpoint
    fn restore(&mut self, snapshot: &CursorSnapshot);
}
