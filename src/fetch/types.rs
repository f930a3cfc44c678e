//! Fetch executor types

use crate::backoff::Cooldown;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of records a paginated query stops at
pub const DEFAULT_ITEM_TARGET: usize = 1000;

/// Configuration for a fetch executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Records collected by an unbounded query before pagination stops (0 = unlimited)
    pub item_target: usize,
    /// Wait applied once every credential in the pool has failed
    pub cooldown: Cooldown,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            item_target: DEFAULT_ITEM_TARGET,
            cooldown: Cooldown::default(),
        }
    }
}

impl FetchConfig {
    /// Set the item target
    #[must_use]
    pub fn with_item_target(mut self, item_target: usize) -> Self {
        self.item_target = item_target;
        self
    }

    /// Set the cool-down
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Snapshot of an executor's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Completed `execute` calls that returned records (possibly none)
    pub executions: u64,
    /// Records forwarded to the store
    pub records: u64,
    /// Credential rotations after API errors
    pub rotations: u64,
    /// Cool-downs after a full failed round
    pub cooldowns: u64,
    /// Queries rejected as not found
    pub invalid_targets: u64,
    /// Queries abandoned after a local error
    pub abandoned: u64,
}

#[derive(Debug, Default)]
pub(crate) struct FetchCounters {
    pub(crate) executions: AtomicU64,
    pub(crate) records: AtomicU64,
    pub(crate) rotations: AtomicU64,
    pub(crate) cooldowns: AtomicU64,
    pub(crate) invalid_targets: AtomicU64,
    pub(crate) abandoned: AtomicU64,
}

impl FetchCounters {
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> FetchStats {
        FetchStats {
            executions: self.executions.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            cooldowns: self.cooldowns.load(Ordering::Relaxed),
            invalid_targets: self.invalid_targets.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}
