//! Credential types
//!
//! A credential is one authenticated identity with its own rate limit
//! window. Credentials are immutable once loaded.

use crate::api::ApiClient;
use crate::types::FetchMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What a credential may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Paged item search
    Search,
    /// Paged subject timelines
    Timeline,
    /// Push subscriptions
    Streaming,
}

impl Capability {
    /// Capability required to run a query in `mode`
    pub fn for_mode(mode: FetchMode) -> Self {
        match mode {
            FetchMode::Search => Capability::Search,
            FetchMode::Timeline => Capability::Timeline,
        }
    }

    /// Capabilities a polling credential gets when none are configured
    pub fn polling() -> Vec<Self> {
        vec![Capability::Search, Capability::Timeline]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Search => write!(f, "search"),
            Capability::Timeline => write!(f, "timeline"),
            Capability::Streaming => write!(f, "streaming"),
        }
    }
}

/// Handle to one authenticated API identity
#[derive(Clone)]
pub struct Credential {
    name: String,
    capabilities: Vec<Capability>,
    client: Arc<dyn ApiClient>,
}

impl Credential {
    /// Create a credential with the given capabilities
    pub fn new(
        name: impl Into<String>,
        capabilities: Vec<Capability>,
        client: Arc<dyn ApiClient>,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities,
            client,
        }
    }

    /// Create a search + timeline credential
    pub fn polling(name: impl Into<String>, client: Arc<dyn ApiClient>) -> Self {
        Self::new(name, Capability::polling(), client)
    }

    /// Create a streaming credential
    pub fn streaming(name: impl Into<String>, client: Arc<dyn ApiClient>) -> Self {
        Self::new(name, vec![Capability::Streaming], client)
    }

    /// Display identity
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured capabilities
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Whether this credential has `capability`
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// The API client authenticated as this identity
    pub fn client(&self) -> &dyn ApiClient {
        self.client.as_ref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
