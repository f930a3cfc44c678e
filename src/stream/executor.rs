//! Reconnecting push-subscription executor

use crate::api::RecordStream;
use crate::backoff::{sleep_or_shutdown, wait_for_shutdown, Sleeper, TokioSleeper};
use crate::credentials::{Credential, CredentialPool};
use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::{Destination, Record};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Default wait between subscription rounds
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Counter snapshot of a stream executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Subscriptions opened
    pub subscriptions: u64,
    /// Records forwarded to the store
    pub records: u64,
    /// Subscriptions closed by a rate-limit signal
    pub rate_limited: u64,
    /// Completed rounds over the whole pool
    pub rounds: u64,
}

#[derive(Debug, Default)]
struct StreamCounters {
    subscriptions: AtomicU64,
    records: AtomicU64,
    rate_limited: AtomicU64,
    rounds: AtomicU64,
}

/// How one subscription ended
enum Ended {
    /// Move on to the next credential
    Closed,
    /// Shutdown was requested
    Shutdown,
}

/// Keeps push subscriptions open across a pool of streaming credentials
///
/// Each round walks the pool in order and keeps one subscription open at a
/// time. Once every credential's subscription has ended, the executor
/// waits `interval` and starts the next round from the first credential.
pub struct StreamExecutor {
    pool: CredentialPool,
    store: Arc<dyn RecordStore>,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
    counters: StreamCounters,
}

impl StreamExecutor {
    /// Create an executor over `pool`
    pub fn new(pool: CredentialPool, store: Arc<dyn RecordStore>) -> Self {
        Self {
            pool,
            store,
            interval: DEFAULT_RECONNECT_INTERVAL,
            sleeper: Arc::new(TokioSleeper),
            counters: StreamCounters::default(),
        }
    }

    /// Set the wait between rounds
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Use a custom sleeper between rounds
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Wait between rounds
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Counter snapshot
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            subscriptions: self.counters.subscriptions.load(Ordering::Relaxed),
            records: self.counters.records.load(Ordering::Relaxed),
            rate_limited: self.counters.rate_limited.load(Ordering::Relaxed),
            rounds: self.counters.rounds.load(Ordering::Relaxed),
        }
    }

    /// Stream records matching `terms` until shutdown
    ///
    /// Returns only once `shutdown` is signalled.
    pub async fn stream(
        &self,
        terms: &[String],
        destination: &Destination,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            for credential in self.pool.iter() {
                if *shutdown.borrow() {
                    return Ok(());
                }
                let ended = self.subscribe(credential, terms, destination, shutdown).await;
                if matches!(ended, Ended::Shutdown) {
                    return Ok(());
                }
            }

            self.counters.rounds.fetch_add(1, Ordering::Relaxed);
            info!(
                "All {} streaming credentials ended, reconnecting in {}s",
                self.pool.len(),
                self.interval.as_secs()
            );
            if sleep_or_shutdown(self.sleeper.as_ref(), self.interval, shutdown).await {
                return Ok(());
            }
        }
    }

    async fn subscribe(
        &self,
        credential: &Credential,
        terms: &[String],
        destination: &Destination,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Ended {
        info!(
            "Opening subscription on '{}' for {:?}",
            credential.name(),
            terms
        );
        self.counters.subscriptions.fetch_add(1, Ordering::Relaxed);

        let stream = match credential.client().subscribe(terms).await {
            Ok(stream) => stream,
            Err(e) => {
                self.note_failure(credential, &e);
                return Ended::Closed;
            }
        };

        self.drain(credential, stream, destination, shutdown).await
    }

    async fn drain(
        &self,
        credential: &Credential,
        mut stream: RecordStream,
        destination: &Destination,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Ended {
        loop {
            let item = tokio::select! {
                () = wait_for_shutdown(shutdown) => {
                    info!("Closing subscription on '{}' for shutdown", credential.name());
                    return Ended::Shutdown;
                }
                item = stream.next() => item,
            };

            match item {
                Some(Ok(record)) => self.forward(record, destination).await,
                Some(Err(e)) => {
                    self.note_failure(credential, &e);
                    return Ended::Closed;
                }
                None => {
                    warn!("Subscription on '{}' ended", credential.name());
                    return Ended::Closed;
                }
            }
        }
    }

    async fn forward(&self, record: Record, destination: &Destination) {
        let id = record.id;
        let batch = [record];
        match self
            .store
            .store(
                &batch,
                &destination.label,
                &destination.collection,
                destination.skip_validation,
            )
            .await
        {
            Ok(()) => {
                self.counters.records.fetch_add(1, Ordering::Relaxed);
                debug!("Stored streamed record {id}");
            }
            Err(e) => error!("Failed to store streamed record {id}: {e}"),
        }
    }

    fn note_failure(&self, credential: &Credential, err: &Error) {
        if err.is_rate_limited() {
            self.counters.rate_limited.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Subscription on '{}' rate limited ({err}); moving on",
                credential.name()
            );
        } else {
            warn!("Subscription on '{}' failed: {err}", credential.name());
        }
    }
}

impl std::fmt::Debug for StreamExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamExecutor")
            .field("credentials", &self.pool.names())
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
