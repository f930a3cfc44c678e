//! Credential-rotating fetch executor

use super::types::{FetchConfig, FetchCounters, FetchStats};
use crate::api::ApiClient;
use crate::backoff::{sleep_or_shutdown, Sleeper, TokioSleeper};
use crate::credentials::CredentialPool;
use crate::error::{Error, ErrorClass, Result};
use crate::pagination::collect_pages;
use crate::store::RecordStore;
use crate::types::{Destination, FetchMode, Query, Record};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Runs queries against a credential pool
///
/// Every remote call made through one executor is serialized by its gate,
/// and the store callback runs while the gate is still held. Collectors
/// sharing an executor therefore never hit the API concurrently.
pub struct FetchExecutor {
    gate: Mutex<CredentialPool>,
    store: Arc<dyn RecordStore>,
    config: FetchConfig,
    sleeper: Arc<dyn Sleeper>,
    shutdown: Option<watch::Receiver<bool>>,
    counters: FetchCounters,
}

impl FetchExecutor {
    /// Create an executor owning `pool`
    pub fn new(pool: CredentialPool, store: Arc<dyn RecordStore>) -> Self {
        Self {
            gate: Mutex::new(pool),
            store,
            config: FetchConfig::default(),
            sleeper: Arc::new(TokioSleeper),
            shutdown: None,
            counters: FetchCounters::default(),
        }
    }

    /// Set the executor configuration
    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom sleeper for cool-downs
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Abort cool-downs when `shutdown` flips to `true`
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Executor configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Counter snapshot
    pub fn stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    /// Index of the credential the next call will use
    pub async fn current_index(&self) -> usize {
        self.gate.lock().await.index()
    }

    /// Name of the credential the next call will use
    pub async fn current_credential(&self) -> String {
        self.gate.lock().await.current().name().to_string()
    }

    /// Run `query` in `mode` and forward the results to the store
    ///
    /// Returns `Error::InvalidTarget` when the API reports the target as
    /// missing, `Error::Store` when the store rejects the batch and
    /// `Error::Shutdown` when shutdown interrupts a cool-down. API errors
    /// are absorbed by rotating credentials. Any other failure abandons the
    /// query with `Error::Abandoned`, so an `Ok` result is always a real
    /// answer from the API, empty or not.
    pub async fn execute(
        &self,
        query: &Query,
        mode: FetchMode,
        destination: &Destination,
    ) -> Result<Vec<Record>> {
        let mut pool = self.gate.lock().await;

        loop {
            let credential = pool.current();
            debug!(
                "Executing {mode} query {} with credential '{}'",
                query.label(),
                credential.name()
            );

            let err = match self.fetch(credential.client(), mode, query).await {
                Ok(records) => {
                    self.store
                        .store(
                            &records,
                            &destination.label,
                            &destination.collection,
                            destination.skip_validation,
                        )
                        .await?;
                    FetchCounters::bump(&self.counters.executions, 1);
                    FetchCounters::bump(&self.counters.records, records.len() as u64);
                    return Ok(records);
                }
                Err(err) if err.must_propagate() => return Err(err),
                Err(err) => err,
            };

            match err.class() {
                ErrorClass::NotFound => {
                    FetchCounters::bump(&self.counters.invalid_targets, 1);
                    let target = query
                        .subject()
                        .map_or_else(|| query.label(), str::to_string);
                    warn!("Target {target} not found: {err}");
                    return Err(Error::invalid_target(target));
                }
                ErrorClass::Api => {
                    let failed = credential.name().to_string();
                    let wrapped = pool.advance();
                    FetchCounters::bump(&self.counters.rotations, 1);

                    if wrapped {
                        let delay = self.config.cooldown.next_delay();
                        FetchCounters::bump(&self.counters.cooldowns, 1);
                        warn!(
                            "Credential '{failed}' failed ({err}); all {} credentials exhausted, cooling down for {}s",
                            pool.len(),
                            delay.as_secs()
                        );
                        if self.cool_down(delay).await {
                            info!("Shutdown during cool-down, abandoning {}", query.label());
                            return Err(Error::Shutdown);
                        }
                    } else {
                        warn!(
                            "Credential '{failed}' failed ({err}); rotating to '{}'",
                            pool.current().name()
                        );
                    }
                }
                ErrorClass::Local => {
                    FetchCounters::bump(&self.counters.abandoned, 1);
                    error!("Abandoning query {}: {err}", query.label());
                    return Err(Error::abandoned(query.label(), err.to_string()));
                }
            }
        }
    }

    async fn fetch(
        &self,
        client: &dyn ApiClient,
        mode: FetchMode,
        query: &Query,
    ) -> Result<Vec<Record>> {
        if query.has_cursor() {
            client.fetch_page(mode, query).await
        } else {
            collect_pages(client, mode, query.clone(), self.config.item_target).await
        }
    }

    // Returns true when shutdown interrupted the wait
    async fn cool_down(&self, delay: Duration) -> bool {
        match self.shutdown {
            Some(ref shutdown) => {
                let mut shutdown = shutdown.clone();
                sleep_or_shutdown(self.sleeper.as_ref(), delay, &mut shutdown).await
            }
            None => {
                self.sleeper.sleep(delay).await;
                false
            }
        }
    }
}

impl std::fmt::Debug for FetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
