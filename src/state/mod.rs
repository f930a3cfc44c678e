//! State management module
//!
//! Checkpoints collector cursors so a restarted process resumes where it
//! stopped. The collectors themselves keep cursors in memory; a state
//! manager is attached by whoever wraps them (the CLI's `run` command).
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Per-collector cursor snapshots
//! - `StateManager` - File-based state persistence

mod manager;
mod types;

pub use manager::StateManager;
pub use types::State;
