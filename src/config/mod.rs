//! Configuration module
//!
//! Parse harvester definitions from YAML files and assemble the runtime.
//!
//! # Overview
//!
//! The config module provides:
//! - `HarvestConfig` - API, store, executor, credential and collector settings
//! - YAML parsing with validation
//! - `build_scheduler` - credential pools, executors and collectors from a config

mod assembly;
mod parser;
mod types;

pub use assembly::{build_credentials, build_scheduler};
pub use parser::{load_config, load_config_from_str, validate_config};
pub use types::{
    CollectorConfig, CollectorKind, CredentialConfig, CredentialsConfig, FetchSettings,
    HarvestConfig, StoreConfig, StreamSettings,
};
