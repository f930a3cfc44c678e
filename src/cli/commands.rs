//! CLI commands and argument parsing

use crate::types::RecordId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cursor-driven API harvester
#[derive(Parser, Debug)]
#[command(name = "cursor-harvester")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Harvester configuration file (YAML)
    #[arg(short, long, global = true, default_value = "harvest.yaml")]
    pub config: PathBuf,

    /// Checkpoint file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start every configured collector
    Run {
        /// Collectors to run (comma-separated, empty = all)
        #[arg(long)]
        collectors: Option<String>,

        /// Override the store directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration
    Validate,

    /// Look up one record with every polling credential
    Check {
        /// Record id to look up
        #[arg(long, default_value = "20")]
        id: RecordId,
    },

    /// Show checkpointed collector state
    Status,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
