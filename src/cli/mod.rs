//! CLI module
//!
//! Command-line interface for running harvesters.
//!
//! # Commands
//!
//! - `run` - Start every configured collector
//! - `validate` - Parse and validate the configuration
//! - `check` - Look up one record with every polling credential
//! - `status` - Show checkpointed collector state

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
