//! Cursor strategy implementations
//!
//! Cursors hold the boundary id actually observed: the newest id for a
//! forward cursor, the oldest for a backward one. The bound sent to the API
//! is derived from it (`since_id = cursor + 1`, `max_id = cursor - 1`).

use super::types::{CursorSnapshot, CursorStrategy, Progress};
use crate::error::{Error, Result};
use crate::types::{max_id, min_id, Destination, Direction, FetchMode, Query, Record, RecordId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Shared bound math
// ============================================================================

/// Attach the bound derived from `cursor` to `query`
///
/// Returns `false` when a backward bound cannot go any lower.
fn apply_bound(query: &mut Query, direction: Direction, cursor: Option<RecordId>) -> bool {
    match (direction, cursor) {
        (Direction::New, Some(cursor)) => {
            query.set_since_id(cursor.saturating_add(1));
            true
        }
        (Direction::Past, Some(0)) => false,
        (Direction::Past, Some(cursor)) => {
            query.set_max_id(cursor - 1);
            true
        }
        _ => true,
    }
}

/// Boundary id after a non-empty page
fn observed_bound(direction: Direction, records: &[Record]) -> Option<RecordId> {
    match direction {
        Direction::New => max_id(records),
        Direction::Past => min_id(records),
        Direction::All => None,
    }
}

// ============================================================================
// NewCursor
// ============================================================================

/// Follows a search forward in time
///
/// An empty page is the steady state ("search exhausted"): the collector
/// waits an extra interval and tries again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCursor {
    cursor: Option<RecordId>,
}

impl NewCursor {
    /// Start after `cursor` (or from the newest records when `None`)
    pub fn new(cursor: Option<RecordId>) -> Self {
        Self { cursor }
    }

    /// Newest id observed
    pub fn cursor(&self) -> Option<RecordId> {
        self.cursor
    }
}

impl CursorStrategy for NewCursor {
    fn kind(&self) -> &'static str {
        "new"
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Search
    }

    fn derive_query(&mut self, base: &Query) -> Option<Query> {
        let mut query = base.clone();
        apply_bound(&mut query, Direction::New, self.cursor);
        Some(query)
    }

    fn advance(&mut self, records: &[Record]) -> Progress {
        match observed_bound(Direction::New, records) {
            Some(newest) => {
                self.cursor = Some(self.cursor.map_or(newest, |c| c.max(newest)));
                Progress::Advanced
            }
            None => Progress::Idle,
        }
    }

    fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot::with_cursor(self.cursor)
    }

    fn restore(&mut self, snapshot: &CursorSnapshot) {
        self.cursor = snapshot.cursor;
    }
}

// ============================================================================
// BackfillCursor
// ============================================================================

/// Walks a search backwards until history runs out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillCursor {
    cursor: Option<RecordId>,
}

impl BackfillCursor {
    /// Start below `cursor` (or from the newest records when `None`)
    pub fn new(cursor: Option<RecordId>) -> Self {
        Self { cursor }
    }

    /// Oldest id observed
    pub fn cursor(&self) -> Option<RecordId> {
        self.cursor
    }
}

impl CursorStrategy for BackfillCursor {
    fn kind(&self) -> &'static str {
        "past"
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Search
    }

    fn derive_query(&mut self, base: &Query) -> Option<Query> {
        let mut query = base.clone();
        apply_bound(&mut query, Direction::Past, self.cursor).then_some(query)
    }

    fn advance(&mut self, records: &[Record]) -> Progress {
        match observed_bound(Direction::Past, records) {
            Some(oldest) => {
                self.cursor = Some(self.cursor.map_or(oldest, |c| c.min(oldest)));
                Progress::Advanced
            }
            None => Progress::Exhausted,
        }
    }

    fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot::with_cursor(self.cursor)
    }

    fn restore(&mut self, snapshot: &CursorSnapshot) {
        self.cursor = snapshot.cursor;
    }
}

// ============================================================================
// SubjectRotation
// ============================================================================

/// Label suffix marking which side of a topic a subject list stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Positive,
    Negative,
}

impl Stance {
    /// Suffix appended to the query label
    pub fn suffix(self) -> &'static str {
        match self {
            Stance::Positive => "-Positive",
            Stance::Negative => "-Negative",
        }
    }
}

/// Cycles through the timelines of a list of subjects
///
/// One subject is queried per cycle. Subjects reported as missing are
/// dropped from the list; the collector is exhausted once the list is
/// empty or a timeline comes back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRotation {
    subjects: Vec<String>,
    current: usize,
    last_used: Option<usize>,
    direction: Direction,
    limit: Option<RecordId>,
    stance: Option<Stance>,
}

impl SubjectRotation {
    /// Rotate over `subjects` starting with the first
    pub fn new(subjects: Vec<String>) -> Self {
        Self {
            subjects,
            current: 0,
            last_used: None,
            direction: Direction::All,
            limit: None,
            stance: None,
        }
    }

    /// Bound every query by `limit` in `direction`
    #[must_use]
    pub fn with_limit(mut self, direction: Direction, limit: Option<RecordId>) -> Self {
        self.direction = direction;
        self.limit = limit;
        self
    }

    /// Tag stored batches with a stance suffix
    #[must_use]
    pub fn with_stance(mut self, stance: Stance) -> Self {
        self.stance = Some(stance);
        self
    }

    /// Remaining subjects
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Index of the subject the next query will use
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Current limit cursor
    pub fn limit(&self) -> Option<RecordId> {
        self.limit
    }

    /// Configured bound direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn drop_last_used(&mut self) -> Option<String> {
        let index = self.last_used.take()?;
        if index >= self.subjects.len() {
            return None;
        }
        let removed = self.subjects.remove(index);

        if self.current > index {
            self.current -= 1;
        }
        if self.current >= self.subjects.len() {
            self.current = 0;
        }
        Some(removed)
    }
}

impl CursorStrategy for SubjectRotation {
    fn kind(&self) -> &'static str {
        "subjects"
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Timeline
    }

    fn derive_query(&mut self, base: &Query) -> Option<Query> {
        if self.subjects.is_empty() {
            return None;
        }
        if self.current >= self.subjects.len() {
            self.current = 0;
        }

        let mut query = base.clone();
        if !apply_bound(&mut query, self.direction, self.limit) {
            return None;
        }
        query.set_subject(self.subjects[self.current].clone());

        self.last_used = Some(self.current);
        self.current = (self.current + 1) % self.subjects.len();
        Some(query)
    }

    fn advance(&mut self, records: &[Record]) -> Progress {
        if records.is_empty() {
            return Progress::Exhausted;
        }
        if self.limit.is_some() {
            if let Some(bound) = observed_bound(self.direction, records) {
                self.limit = Some(bound);
            }
        }
        Progress::Advanced
    }

    fn on_invalid_target(&mut self, err: Error) -> Result<Progress> {
        let Error::InvalidTarget { ref target } = err else {
            return Err(err);
        };

        match self.drop_last_used() {
            Some(removed) => {
                warn!(
                    "Dropping subject '{removed}' ({target}); {} left",
                    self.subjects.len()
                );
                if self.subjects.is_empty() {
                    info!("No subjects left");
                    Ok(Progress::Exhausted)
                } else {
                    Ok(Progress::TargetDropped)
                }
            }
            None => Err(err),
        }
    }

    fn destination(&self, base: &Destination) -> Destination {
        match self.stance {
            Some(stance) => base.relabel(format!("{}{}", base.label, stance.suffix())),
            None => base.clone(),
        }
    }

    fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            cursor: self.limit,
            subjects: Some(self.subjects.clone()),
            index: self.current,
            exhausted: false,
        }
    }

    fn restore(&mut self, snapshot: &CursorSnapshot) {
        if let Some(ref subjects) = snapshot.subjects {
            self.subjects.clone_from(subjects);
        }
        self.limit = snapshot.cursor;
        self.current = if snapshot.index < self.subjects.len() {
            snapshot.index
        } else {
            0
        };
        self.last_used = None;
    }
}
