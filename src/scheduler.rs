//! Collector scheduler
//!
//! Runs every collector as its own tokio task. A collector that panics or
//! exhausts its source ends on its own; the others keep running.

use crate::collector::{Collector, Termination};
use std::collections::HashMap;
use tokio::sync::watch;
use tokio::task::{Id, JoinSet};
use tracing::{error, info};

/// How a collector task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The run loop returned
    Finished(Termination),
    /// The task panicked
    Panicked(String),
    /// The task was cancelled
    Cancelled,
}

/// Exit record of one collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorExit {
    /// Collector name
    pub name: String,
    /// How it ended
    pub reason: ExitReason,
}

/// Holds collectors until they are run
#[derive(Default)]
pub struct Scheduler {
    collectors: Vec<Box<dyn Collector>>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collector
    pub fn spawn(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// Add a collector (builder form)
    #[must_use]
    pub fn with(mut self, collector: Box<dyn Collector>) -> Self {
        self.spawn(collector);
        self
    }

    /// Number of collectors
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Whether no collector was added
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Names of the collectors in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Run every collector until each has ended
    ///
    /// Exits are returned in completion order.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Vec<CollectorExit> {
        let mut tasks: JoinSet<(String, Termination)> = JoinSet::new();
        let mut names: HashMap<Id, String> = HashMap::new();

        for mut collector in self.collectors {
            let name = collector.name().to_string();
            let shutdown = shutdown.clone();
            let task_name = name.clone();
            let handle = tasks.spawn(async move {
                let termination = collector.run(shutdown).await;
                (task_name, termination)
            });
            names.insert(handle.id(), name);
        }
        info!("Scheduler started {} collectors", names.len());

        let mut exits = Vec::with_capacity(names.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let exit = match joined {
                Ok((id, (name, termination))) => {
                    names.remove(&id);
                    info!("Collector '{name}' finished: {termination:?}");
                    CollectorExit {
                        name,
                        reason: ExitReason::Finished(termination),
                    }
                }
                Err(join_error) => {
                    let name = names
                        .remove(&join_error.id())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    let reason = if join_error.is_panic() {
                        let message = panic_message(join_error.into_panic());
                        error!("Collector '{name}' panicked: {message}");
                        ExitReason::Panicked(message)
                    } else {
                        error!("Collector '{name}' was cancelled");
                        ExitReason::Cancelled
                    };
                    CollectorExit { name, reason }
                }
            };
            exits.push(exit);
        }

        exits
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
