//! Error types for cursor-harvester
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The fetch executor drives its retry policy off [`Error::class`]:
//! not-found errors are fatal to one target, API errors rotate credentials,
//! and everything else is a local failure that abandons the query for the
//! current cycle.

use thiserror::Error;

/// The main error type for cursor-harvester
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Remote API Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Rate limited (code {code}), retry after {retry_after_seconds}s")]
    RateLimited { code: u32, retry_after_seconds: u64 },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Record has no usable identifier: {message}")]
    MissingRecordId { message: String },

    // ============================================================================
    // Collection Errors
    // ============================================================================
    #[error("Invalid target '{target}'")]
    InvalidTarget { target: String },

    #[error("Query {query} abandoned: {reason}")]
    Abandoned { query: String, reason: String },

    #[error("Subscription on '{credential}' terminated: {reason}")]
    StreamTerminated { credential: String, reason: String },

    #[error("Shutdown requested")]
    Shutdown,

    // ============================================================================
    // Store / State Errors
    // ============================================================================
    #[error("Store error: {message}")]
    Store { message: String },

    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by the fetch executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The addressed subject does not exist; fatal to that target only
    NotFound,
    /// Remote failure (rate limit, auth, server, transport); rotate and retry
    Api,
    /// Anything raised locally; abandon the query for this cycle
    Local,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a generic API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(code: u32, retry_after_seconds: u64) -> Self {
        Self::RateLimited {
            code,
            retry_after_seconds,
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(target: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
        }
    }

    /// Create an abandoned-query error
    pub fn abandoned(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Abandoned {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Create a stream termination error
    pub fn stream_terminated(credential: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StreamTerminated {
            credential: credential.into(),
            reason: reason.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Classify this error for the fetch executor's retry policy
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NotFound { .. } | Error::InvalidTarget { .. } => ErrorClass::NotFound,
            Error::Http(_)
            | Error::RateLimited { .. }
            | Error::Api { .. }
            | Error::StreamTerminated { .. } => ErrorClass::Api,
            _ => ErrorClass::Local,
        }
    }

    /// Check if this error is a rate limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Check if this error must reach the collector instead of being absorbed
    /// by the executor
    pub fn must_propagate(&self) -> bool {
        matches!(self, Error::Store { .. } | Error::Shutdown)
    }
}

/// Result type alias for cursor-harvester
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
