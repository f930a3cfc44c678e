//! Collector module
//!
//! A collector is one independently scheduled unit of harvesting.
//!
//! # Overview
//!
//! - `PollingCollector` - drives a cursor strategy through a fetch executor
//! - `StreamingCollector` - keeps a stream executor alive
//! - `Collector` - what the scheduler runs

mod polling;
mod streaming;
mod types;

pub use polling::PollingCollector;
pub use streaming::StreamingCollector;
pub use types::{CollectorStats, Termination, DEFAULT_INTERVAL};

use async_trait::async_trait;
use tokio::sync::watch;

/// A long-running collector
///
/// `run` never fails: every per-cycle error is logged inside the loop.
/// It returns once the collector is exhausted or `shutdown` flips to `true`.
#[async_trait]
pub trait Collector: Send {
    /// Collector name
    fn name(&self) -> &str;

    /// Run until exhausted or shut down
    async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Termination;
}
