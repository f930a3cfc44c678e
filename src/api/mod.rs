//! Remote API module
//!
//! Provides the API client capability used by both executors.
//!
//! # Features
//!
//! - **ApiClient trait**: paged search, paged timeline, single lookup, push subscription
//! - **HttpApiClient**: JSON-over-HTTP implementation with bearer auth
//! - **Error classification**: not found, rate limited (with code), other
//! - **Pacing**: optional per-credential token bucket using governor

mod client;
mod http;
mod rate_limit;

pub use client::{ApiClient, RecordStream};
pub use http::{HttpApiClient, HttpApiConfig, RATE_LIMIT_CODE, STREAM_RATE_LIMIT_CODE};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
