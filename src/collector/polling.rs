//! Polling collector driver

use super::types::{CollectorStats, Termination, DEFAULT_INTERVAL};
use super::Collector;
use crate::backoff::{sleep_or_shutdown, Sleeper, TokioSleeper};
use crate::cursor::{CursorSnapshot, CursorStrategy, Progress};
use crate::error::{Error, Result};
use crate::fetch::FetchExecutor;
use crate::state::StateManager;
use crate::types::{Destination, Query};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Drives one cursor strategy against a shared fetch executor
///
/// Each cycle derives a query from the strategy, executes it and hands the
/// result back to the strategy. Between cycles the collector sleeps for its
/// interval; an idle cycle sleeps one extra interval.
pub struct PollingCollector<S: CursorStrategy> {
    name: String,
    strategy: S,
    executor: Arc<FetchExecutor>,
    base: Query,
    destination: Destination,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
    state: Option<StateManager>,
    stats: CollectorStats,
    exhausted: bool,
}

impl<S: CursorStrategy> PollingCollector<S> {
    /// Create a collector
    pub fn new(
        name: impl Into<String>,
        strategy: S,
        executor: Arc<FetchExecutor>,
        base: Query,
        destination: Destination,
    ) -> Self {
        Self {
            name: name.into(),
            strategy,
            executor,
            base,
            destination,
            interval: DEFAULT_INTERVAL,
            sleeper: Arc::new(TokioSleeper),
            state: None,
            stats: CollectorStats::default(),
            exhausted: false,
        }
    }

    /// Set the wait between cycles
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Use a custom sleeper between cycles
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Checkpoint the cursor after every cycle
    #[must_use]
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = Some(state);
        self
    }

    /// Resume from a checkpoint
    pub fn restore(&mut self, snapshot: &CursorSnapshot) {
        self.strategy.restore(snapshot);
        self.exhausted = snapshot.exhausted;
    }

    /// The strategy
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Collector statistics
    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// Whether the collector has terminated for good
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Current cursor state, including the exhausted flag
    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            exhausted: self.exhausted,
            ..self.strategy.snapshot()
        }
    }

    /// Run one fetch cycle
    ///
    /// Errors other than an invalid target the strategy can absorb are
    /// returned without touching the cursor.
    pub async fn cycle(&mut self) -> Result<Progress> {
        let Some(query) = self.strategy.derive_query(&self.base) else {
            info!("Collector '{}' has nothing left to query", self.name);
            self.exhausted = true;
            self.checkpoint().await;
            return Ok(Progress::Exhausted);
        };

        let destination = self.strategy.destination(&self.destination);
        self.stats.cycles += 1;
        debug!("Collector '{}' cycle {}: {query}", self.name, self.stats.cycles);

        let progress = match self
            .executor
            .execute(&query, self.strategy.mode(), &destination)
            .await
        {
            Ok(records) => {
                self.stats.records += records.len() as u64;
                let progress = self.strategy.advance(&records);
                info!(
                    "Collector '{}' got {} records for {}",
                    self.name,
                    records.len(),
                    query.label()
                );
                progress
            }
            Err(err @ Error::InvalidTarget { .. }) => self.strategy.on_invalid_target(err)?,
            Err(err) => return Err(err),
        };

        match progress {
            Progress::Idle => self.stats.idle_cycles += 1,
            Progress::TargetDropped => self.stats.dropped_targets += 1,
            Progress::Exhausted => self.exhausted = true,
            Progress::Advanced => {}
        }

        self.checkpoint().await;
        Ok(progress)
    }

    async fn checkpoint(&self) {
        let Some(ref state) = self.state else {
            return;
        };
        if let Err(e) = state.save_collector(&self.name, self.snapshot()).await {
            warn!("Failed to checkpoint collector '{}': {e}", self.name);
        }
    }

    /// Loop cycles until exhausted or shutdown
    pub async fn run_loop(&mut self, mut shutdown: watch::Receiver<bool>) -> Termination {
        info!(
            "Starting {} collector '{}' every {}s",
            self.strategy.kind(),
            self.name,
            self.interval.as_secs()
        );

        loop {
            if self.exhausted {
                info!("Collector '{}' exhausted", self.name);
                return Termination::Exhausted;
            }
            if *shutdown.borrow() {
                return Termination::Shutdown;
            }

            let waits = match self.cycle().await {
                Ok(Progress::Exhausted) => continue,
                Ok(Progress::TargetDropped) => 0,
                Ok(Progress::Idle) => {
                    info!(
                        "Search exhausted for '{}', sleeping an extra {}s",
                        self.name,
                        self.interval.as_secs()
                    );
                    2
                }
                Ok(Progress::Advanced) => 1,
                Err(Error::Shutdown) => return Termination::Shutdown,
                Err(e) => {
                    self.stats.errors += 1;
                    error!("Collector '{}' cycle failed: {e}", self.name);
                    1
                }
            };

            for _ in 0..waits {
                if sleep_or_shutdown(self.sleeper.as_ref(), self.interval, &mut shutdown).await {
                    return Termination::Shutdown;
                }
            }
        }
    }
}

#[async_trait]
impl<S: CursorStrategy + 'static> Collector for PollingCollector<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Termination {
        self.run_loop(shutdown).await
    }
}
