//! Streaming collector

use super::types::Termination;
use super::Collector;
use crate::backoff::{sleep_or_shutdown, Sleeper, TokioSleeper};
use crate::stream::StreamExecutor;
use crate::types::Destination;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Keeps a stream executor running for one set of track terms
pub struct StreamingCollector {
    name: String,
    executor: Arc<StreamExecutor>,
    terms: Vec<String>,
    destination: Destination,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
    restarts: u64,
}

impl StreamingCollector {
    /// Create a collector streaming `terms`
    pub fn new(
        name: impl Into<String>,
        executor: Arc<StreamExecutor>,
        terms: Vec<String>,
        destination: Destination,
    ) -> Self {
        let interval = executor.interval();
        Self {
            name: name.into(),
            executor,
            terms,
            destination,
            interval,
            sleeper: Arc::new(TokioSleeper),
            restarts: 0,
        }
    }

    /// Use a custom sleeper before restarts
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Track terms
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Times the executor returned without a shutdown request
    pub fn restarts(&self) -> u64 {
        self.restarts
    }
}

#[async_trait]
impl Collector for StreamingCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Termination {
        info!("Starting stream collector '{}' for {:?}", self.name, self.terms);

        loop {
            let result = self
                .executor
                .stream(&self.terms, &self.destination, &mut shutdown)
                .await;
            if *shutdown.borrow() {
                return Termination::Shutdown;
            }

            match result {
                Ok(()) => error!("Stream for '{}' returned unexpectedly", self.name),
                Err(e) => error!("Stream for '{}' failed: {e}", self.name),
            }
            self.restarts += 1;

            if sleep_or_shutdown(self.sleeper.as_ref(), self.interval, &mut shutdown).await {
                return Termination::Shutdown;
            }
        }
    }
}
