//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{build_scheduler, load_config, CollectorKind, HarvestConfig};
use crate::error::{Error, Result, ResultExt};
use crate::scheduler::{CollectorExit, ExitReason};
use crate::state::StateManager;
use crate::store::JsonlStore;
use crate::types::RecordId;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                collectors,
                output,
            } => self.run_collectors(collectors.as_deref(), output.clone()).await,
            Commands::Validate => self.validate(),
            Commands::Check { id } => self.check(*id).await,
            Commands::Status => self.status().await,
        }
    }

    /// Load the harvester configuration
    fn load_config(&self) -> Result<HarvestConfig> {
        load_config(&self.cli.config)
    }

    /// Load checkpoints
    fn load_state(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    /// Start collectors and wait until they end or Ctrl-C is pressed
    async fn run_collectors(&self, filter: Option<&str>, output: Option<PathBuf>) -> Result<()> {
        let mut config = self.load_config()?;

        if let Some(filter) = filter {
            let wanted: HashSet<&str> = filter
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if !wanted.is_empty() {
                config
                    .collectors
                    .retain(|c| wanted.contains(c.name.as_str()));
                if config.collectors.is_empty() {
                    return Err(Error::config(format!(
                        "No configured collector matches '{filter}'"
                    )));
                }
            }
        }
        if let Some(directory) = output {
            config.store.directory = directory;
        }

        let state = self.load_state()?;
        let store = Arc::new(JsonlStore::new(&config.store.directory));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scheduler = build_scheduler(&config, store, Some(&state), shutdown_rx.clone()).await?;
        if scheduler.is_empty() {
            self.log("INFO", "Every selected collector is already exhausted");
            return Ok(());
        }

        self.log(
            "INFO",
            &format!(
                "Starting {} collectors: {}",
                scheduler.len(),
                scheduler.names().join(", ")
            ),
        );

        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, shutting down collectors");
                shutdown_tx.send_replace(true);
            }
        });

        let start = Instant::now();
        let exits = scheduler.run(shutdown_rx).await;
        signal.abort();

        for exit in &exits {
            self.output_message(&exit_message(exit));
        }
        info!(
            "All collectors ended after {:.1}s",
            start.elapsed().as_secs_f64()
        );

        state.save().await.context("Failed to save checkpoints")?;
        Ok(())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        let collectors: Vec<Value> = config
            .collectors
            .iter()
            .map(|c| {
                let mut entry = json!({
                    "name": c.name,
                    "kind": c.kind.name(),
                    "collection": c.collection_name(),
                    "interval_minutes": c.interval_minutes,
                });
                match &c.kind {
                    CollectorKind::Subjects { subjects, .. } => {
                        entry["subjects"] = json!(subjects.len());
                    }
                    CollectorKind::Stream { terms } => {
                        entry["terms"] = json!(terms);
                    }
                    _ => entry["query"] = json!(c.query),
                }
                entry
            })
            .collect();

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration is valid with {} collectors, {} polling and {} streaming credentials",
                    config.collectors.len(),
                    config.credentials.polling.len(),
                    config.credentials.streaming.len()
                )
            }
        }));
        self.output_message(&json!({
            "type": "COLLECTORS",
            "collectors": collectors,
        }));

        Ok(())
    }

    /// Look up one record with every polling credential
    async fn check(&self, id: RecordId) -> Result<()> {
        let config = self.load_config()?;
        let pool = config.polling_pool()?;

        self.log(
            "INFO",
            &format!("Checking {} polling credentials with record {id}", pool.len()),
        );

        for credential in pool.iter() {
            let message = match credential.client().lookup(id).await {
                Ok(record) => json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "credential": credential.name(),
                        "status": "SUCCEEDED",
                        "message": format!("Fetched record {}", record.id)
                    }
                }),
                Err(e) => json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "credential": credential.name(),
                        "status": "FAILED",
                        "message": format!("Lookup failed: {e}")
                    }
                }),
            };
            self.output_message(&message);
        }

        Ok(())
    }

    /// Show checkpointed state
    async fn status(&self) -> Result<()> {
        if self.cli.state.is_none() {
            return Err(Error::config("State file not specified (use --state)"));
        }
        let state = self.load_state()?;
        let state = serde_json::to_value(&*state.state().await)?;

        self.output_message(&json!({
            "type": "STATE",
            "state": state,
        }));
        Ok(())
    }

    fn log(&self, level: &str, message: &str) {
        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": level,
                "message": message
            }
        }));
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

fn exit_message(exit: &CollectorExit) -> Value {
    let (status, detail) = match &exit.reason {
        ExitReason::Finished(termination) => ("FINISHED", format!("{termination:?}")),
        ExitReason::Panicked(message) => ("PANICKED", message.clone()),
        ExitReason::Cancelled => ("CANCELLED", String::new()),
    };
    json!({
        "type": "COLLECTOR_EXIT",
        "collectorExit": {
            "name": exit.name,
            "status": status,
            "detail": detail
        }
    })
}
