//! Configuration types
//!
//! Declarative harvester configuration for YAML parsing.

use crate::api::HttpApiConfig;
use crate::credentials::Capability;
use crate::cursor::Stance;
use crate::types::{Direction, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Top-level Config
// ============================================================================

/// Top-level harvester configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HarvestConfig {
    /// HTTP client settings shared by every credential
    #[serde(default)]
    pub api: HttpApiConfig,
    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Polling executor settings
    #[serde(default)]
    pub fetch: FetchSettings,
    /// Streaming executor settings
    #[serde(default)]
    pub stream: StreamSettings,
    /// Credential tiers
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Collector definitions
    #[serde(default)]
    pub collectors: Vec<CollectorConfig>,
}

// ============================================================================
// Store / Executor Settings
// ============================================================================

/// Record store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Root directory of the JSON Lines store
    #[serde(default = "default_store_directory")]
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_directory(),
        }
    }
}

fn default_store_directory() -> PathBuf {
    PathBuf::from("data")
}

/// Polling executor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FetchSettings {
    /// Records an unbounded query collects before pagination stops (0 = unlimited)
    #[serde(default = "default_item_target")]
    pub item_target: usize,
    /// Per-call result limit (`count`)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Cool-down after every credential failed once
    #[serde(default = "default_minutes")]
    pub cooldown_minutes: u64,
    /// Upper bound of the random extra cool-down
    #[serde(default)]
    pub cooldown_jitter_seconds: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            item_target: default_item_target(),
            page_size: default_page_size(),
            cooldown_minutes: default_minutes(),
            cooldown_jitter_seconds: 0,
        }
    }
}

fn default_item_target() -> usize {
    crate::fetch::DEFAULT_ITEM_TARGET
}

fn default_page_size() -> u32 {
    100
}

fn default_minutes() -> u64 {
    15
}

/// Streaming executor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StreamSettings {
    /// Wait between subscription rounds
    #[serde(default = "default_minutes")]
    pub reconnect_minutes: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_minutes: default_minutes(),
        }
    }
}

impl StreamSettings {
    /// Wait between subscription rounds
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_minutes * 60)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credential tiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CredentialsConfig {
    /// Credentials shared by every polling collector
    #[serde(default)]
    pub polling: Vec<CredentialConfig>,
    /// Credentials used for push subscriptions
    #[serde(default)]
    pub streaming: Vec<CredentialConfig>,
}

/// One credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CredentialConfig {
    /// Display name
    pub name: String,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable holding the bearer token
    #[serde(default)]
    pub token_env: Option<String>,
    /// Capabilities (defaults depend on the tier)
    #[serde(default)]
    pub capabilities: Option<Vec<Capability>>,
}

// ============================================================================
// Collectors
// ============================================================================

/// One collector definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CollectorConfig {
    /// Unique collector name (also the checkpoint key)
    pub name: String,
    /// Search term; doubles as the query label
    #[serde(default)]
    pub query: String,
    /// Store collection (defaults to the query, or the name for streams)
    #[serde(default)]
    pub collection: Option<String>,
    /// Wait between cycles
    #[serde(default = "default_minutes")]
    pub interval_minutes: u64,
    /// Include retweets / reposts
    #[serde(default)]
    pub include_retweets: bool,
    /// Extra static query parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Skip payload validation in the store
    #[serde(default)]
    pub skip_validation: bool,
    /// Kind-specific settings
    #[serde(flatten)]
    pub kind: CollectorKind,
}

impl CollectorConfig {
    /// Wait between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    /// Collection the collector stores into
    pub fn collection_name(&self) -> &str {
        match self.collection.as_deref() {
            Some(collection) => collection,
            None if self.query.is_empty() => &self.name,
            None => &self.query,
        }
    }

    /// Whether the collector uses the polling tier
    pub fn is_polling(&self) -> bool {
        !matches!(self.kind, CollectorKind::Stream { .. })
    }
}

/// Kind-specific collector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectorKind {
    /// Follow a search forward in time
    New {
        /// Newest id already collected
        #[serde(default)]
        cursor: Option<RecordId>,
    },
    /// Walk a search backwards until history runs out
    Past {
        /// Oldest id already collected
        #[serde(default)]
        cursor: Option<RecordId>,
    },
    /// Rotate over subject timelines
    Subjects {
        /// Subject identifiers
        subjects: Vec<String>,
        /// Bound direction
        #[serde(default)]
        direction: Direction,
        /// Boundary id the bound starts from
        #[serde(default)]
        limit_id: Option<RecordId>,
        /// Label suffix
        #[serde(default)]
        stance: Option<Stance>,
    },
    /// Push subscription on track terms
    Stream {
        /// Track terms
        terms: Vec<String>,
    },
}

impl CollectorKind {
    /// Short kind name
    pub fn name(&self) -> &'static str {
        match self {
            CollectorKind::New { .. } => "new",
            CollectorKind::Past { .. } => "past",
            CollectorKind::Subjects { .. } => "subjects",
            CollectorKind::Stream { .. } => "stream",
        }
    }

    /// Capability the collector needs from its credential tier
    pub fn required_capability(&self) -> Capability {
        match self {
            CollectorKind::New { .. } | CollectorKind::Past { .. } => Capability::Search,
            CollectorKind::Subjects { .. } => Capability::Timeline,
            CollectorKind::Stream { .. } => Capability::Streaming,
        }
    }
}
