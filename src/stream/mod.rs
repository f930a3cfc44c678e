//! Stream module
//!
//! Long-lived push subscriptions with automatic reconnection. Streaming
//! does not share the polling gate: a subscription is one persistent
//! connection rather than a series of rate-limited calls.

mod executor;

pub use executor::{StreamExecutor, StreamStats, DEFAULT_RECONNECT_INTERVAL};
