//! Timed backoff
//!
//! Every wait in the crate (executor cool-downs, collector cycle intervals,
//! stream reconnect delays) goes through a [`Sleeper`], so tests can record
//! the requested durations instead of waiting on a real timer.

use async_trait::async_trait;
use rand::random_range;
use std::time::Duration;
use tokio::sync::watch;

/// Something that can suspend the current task for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Cool-down applied after a full round of failed credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    /// Base wait
    pub interval: Duration,
    /// Upper bound of the random extra wait added to `interval`
    pub jitter: Duration,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            jitter: Duration::ZERO,
        }
    }
}

impl Cooldown {
    /// Create a cool-down with no jitter
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            jitter: Duration::ZERO,
        }
    }

    /// Create a cool-down from whole minutes
    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes * 60))
    }

    /// Set the jitter bound
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Duration of the next wait: `interval` plus up to `jitter`
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(random_range(0..=jitter_ms))
    }
}

/// Resolve once shutdown is signalled
///
/// Never resolves when the sender is gone, since nobody can ask us to stop
/// any more.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sleep unless shutdown is signalled first
///
/// Returns `true` when the caller should stop.
pub async fn sleep_or_shutdown(
    sleeper: &dyn Sleeper,
    duration: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if *shutdown.borrow() {
        return true;
    }

    let interrupted = tokio::select! {
        () = sleeper.sleep(duration) => false,
        () = wait_for_shutdown(shutdown) => true,
    };
    interrupted || *shutdown.borrow()
}
