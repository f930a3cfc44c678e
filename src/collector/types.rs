//! Collector types

use std::time::Duration;

/// Default wait between polling cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Why a collector's run loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Nothing left to collect
    Exhausted,
    /// Shutdown was requested
    Shutdown,
}

/// Statistics of one polling collector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Cycles that reached the executor
    pub cycles: u64,
    /// Records returned across all cycles
    pub records: u64,
    /// Cycles that came back empty without terminating the collector
    pub idle_cycles: u64,
    /// Cycles that failed and were logged
    pub errors: u64,
    /// Subjects dropped as invalid
    pub dropped_targets: u64,
}
