// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # cursor-harvester
//!
//! Long-running collectors that pull records from a rate-limited remote API
//! through a shared pool of credentials.
//!
//! ## Features
//!
//! - **Credential rotation**: one gate serializes every polling call; API
//!   errors rotate to the next credential, a full failed round cools down
//! - **Cursor strategies**: follow a search forward, backfill it until
//!   history runs out, or rotate over subject timelines
//! - **Streaming**: push subscriptions that reconnect across credentials
//! - **Checkpointing**: cursors survive restarts through a JSON state file
//! - **JSON Lines store**: day-partitioned output per collection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cursor_harvester::config::{build_scheduler, load_config};
//! use cursor_harvester::store::JsonlStore;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> cursor_harvester::Result<()> {
//!     let config = load_config("harvest.yaml")?;
//!     let store = Arc::new(JsonlStore::new(&config.store.directory));
//!     let (_tx, rx) = watch::channel(false);
//!
//!     let scheduler = build_scheduler(&config, store, None, rx.clone()).await?;
//!     for exit in scheduler.run(rx).await {
//!         println!("{} ended: {:?}", exit.name, exit.reason);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Scheduler                           │
//! │        one task per collector, shared shutdown signal        │
//! └──────────────────────────────────────────────────────────────┘
//!                 │                                │
//! ┌───────────────┴──────────────┐  ┌──────────────┴─────────────┐
//! │ PollingCollector<Strategy>   │  │ StreamingCollector         │
//! │ New / Backfill / Rotation    │  │                            │
//! ├──────────────────────────────┤  ├────────────────────────────┤
//! │ FetchExecutor                │  │ StreamExecutor             │
//! │ gate + pool, pagination,     │  │ subscribe, drain,          │
//! │ rotation, cool-down          │  │ reconnect                  │
//! └──────────────────────────────┘  └────────────────────────────┘
//!                 │                                │
//! ┌───────────────┴────────────────────────────────┴─────────────┐
//! │            ApiClient (per credential)   RecordStore          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the harvester
pub mod error;

/// Common types and type aliases
pub mod types;

/// Cool-down, sleeping and shutdown helpers
pub mod backoff;

/// Remote API client capability
pub mod api;

/// Credentials and the credential pool
pub mod credentials;

/// Id-bounded pagination
pub mod pagination;

/// Record stores
pub mod store;

/// Polling fetch executor
pub mod fetch;

/// Cursor strategies
pub mod cursor;

/// Collectors and their run loops
pub mod collector;

/// Streaming executor
pub mod stream;

/// Collector scheduler
pub mod scheduler;

/// State management and checkpointing
pub mod state;

/// Configuration loading and runtime assembly
pub mod config;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use collector::{Collector, PollingCollector, StreamingCollector, Termination};
pub use config::{load_config, load_config_from_str, HarvestConfig};
pub use cursor::{BackfillCursor, CursorStrategy, NewCursor, SubjectRotation};
pub use fetch::FetchExecutor;
pub use scheduler::Scheduler;
pub use stream::StreamExecutor;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
