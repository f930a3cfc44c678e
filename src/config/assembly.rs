//! Runtime assembly from configuration
//!
//! Turns a validated [`HarvestConfig`] into credential pools, executors and
//! collectors ready for the scheduler.

use super::types::{CollectorConfig, CollectorKind, CredentialConfig, HarvestConfig};
use crate::api::{HttpApiClient, HttpApiConfig};
use crate::backoff::Cooldown;
use crate::collector::{Collector, PollingCollector, StreamingCollector};
use crate::credentials::{Capability, Credential, CredentialPool};
use crate::cursor::{BackfillCursor, CursorStrategy, NewCursor, SubjectRotation};
use crate::error::Result;
use crate::fetch::{FetchConfig, FetchExecutor};
use crate::scheduler::Scheduler;
use crate::state::StateManager;
use crate::store::RecordStore;
use crate::stream::StreamExecutor;
use crate::types::{Destination, Query};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Build one HTTP-backed credential per definition
pub fn build_credentials(
    api: &HttpApiConfig,
    definitions: &[CredentialConfig],
    default_capabilities: &[Capability],
) -> Result<Vec<Credential>> {
    definitions
        .iter()
        .map(|definition| {
            let client = HttpApiClient::new(api.clone(), definition.resolve_token()?)?;
            let capabilities = definition
                .capabilities
                .clone()
                .unwrap_or_else(|| default_capabilities.to_vec());
            Ok(Credential::new(
                definition.name.clone(),
                capabilities,
                Arc::new(client),
            ))
        })
        .collect()
}

impl HarvestConfig {
    /// Executor settings
    pub fn fetch_config(&self) -> FetchConfig {
        let cooldown = Cooldown::from_minutes(self.fetch.cooldown_minutes)
            .with_jitter(Duration::from_secs(self.fetch.cooldown_jitter_seconds));
        FetchConfig::default()
            .with_item_target(self.fetch.item_target)
            .with_cooldown(cooldown)
    }

    /// Pool of polling credentials
    pub fn polling_pool(&self) -> Result<CredentialPool> {
        CredentialPool::new(build_credentials(
            &self.api,
            &self.credentials.polling,
            &Capability::polling(),
        )?)
    }

    /// Pool of streaming credentials
    pub fn streaming_pool(&self) -> Result<CredentialPool> {
        CredentialPool::new(build_credentials(
            &self.api,
            &self.credentials.streaming,
            &[Capability::Streaming],
        )?)
    }

    /// Static query a collector starts every cycle from
    pub fn base_query(&self, collector: &CollectorConfig) -> Query {
        let mut query = Query::new(self.fetch.page_size)
            .with_term(collector.query.clone())
            .with_include_retweets(collector.include_retweets);
        for (key, value) in &collector.params {
            query = query.with_param(key.clone(), value.clone());
        }
        query
    }

    /// Store arguments for a collector
    pub fn destination(&self, collector: &CollectorConfig) -> Destination {
        let label = if collector.query.is_empty() {
            collector.name.clone()
        } else {
            collector.query.clone()
        };
        Destination::new(collector.collection_name(), label)
            .with_skip_validation(collector.skip_validation)
    }

    fn has_polling(&self) -> bool {
        self.collectors.iter().any(CollectorConfig::is_polling)
    }

    fn has_streaming(&self) -> bool {
        self.collectors.iter().any(|c| !c.is_polling())
    }
}

/// Build a scheduler holding every configured collector
///
/// Collectors are restored from `state` when a snapshot exists; those whose
/// snapshot says exhausted are skipped.
pub async fn build_scheduler(
    config: &HarvestConfig,
    store: Arc<dyn RecordStore>,
    state: Option<&StateManager>,
    shutdown: watch::Receiver<bool>,
) -> Result<Scheduler> {
    let fetch = if config.has_polling() {
        let executor = FetchExecutor::new(config.polling_pool()?, store.clone())
            .with_config(config.fetch_config())
            .with_shutdown(shutdown);
        Some(Arc::new(executor))
    } else {
        None
    };

    let stream = if config.has_streaming() {
        let executor = StreamExecutor::new(config.streaming_pool()?, store)
            .with_interval(config.stream.reconnect_interval());
        Some(Arc::new(executor))
    } else {
        None
    };

    let mut scheduler = Scheduler::new();
    for collector in &config.collectors {
        let built: Option<Box<dyn Collector>> = match (&collector.kind, &fetch, &stream) {
            (CollectorKind::New { cursor }, Some(fetch), _) => {
                polling(config, collector, NewCursor::new(*cursor), fetch, state).await
            }
            (CollectorKind::Past { cursor }, Some(fetch), _) => {
                polling(config, collector, BackfillCursor::new(*cursor), fetch, state).await
            }
            (
                CollectorKind::Subjects {
                    subjects,
                    direction,
                    limit_id,
                    stance,
                },
                Some(fetch),
                _,
            ) => {
                let mut strategy =
                    SubjectRotation::new(subjects.clone()).with_limit(*direction, *limit_id);
                if let Some(stance) = stance {
                    strategy = strategy.with_stance(*stance);
                }
                polling(config, collector, strategy, fetch, state).await
            }
            (CollectorKind::Stream { terms }, _, Some(stream)) => {
                Some(Box::new(StreamingCollector::new(
                    collector.name.clone(),
                    stream.clone(),
                    terms.clone(),
                    config.destination(collector),
                )))
            }
            _ => None,
        };

        if let Some(built) = built {
            scheduler.spawn(built);
        }
    }

    Ok(scheduler)
}

async fn polling<S: CursorStrategy + 'static>(
    config: &HarvestConfig,
    collector: &CollectorConfig,
    strategy: S,
    executor: &Arc<FetchExecutor>,
    state: Option<&StateManager>,
) -> Option<Box<dyn Collector>> {
    let mut built = PollingCollector::new(
        collector.name.clone(),
        strategy,
        executor.clone(),
        config.base_query(collector),
        config.destination(collector),
    )
    .with_interval(collector.interval());

    if let Some(state) = state {
        if let Some(snapshot) = state.collector(&collector.name).await {
            if snapshot.exhausted {
                info!("Skipping exhausted collector '{}'", collector.name);
                return None;
            }
            info!("Resuming collector '{}' from checkpoint", collector.name);
            built.restore(&snapshot);
        }
        built = built.with_state(state.clone());
    }

    Some(Box::new(built))
}
