//! Fetch module
//!
//! The fetch executor turns one logical query into a bounded sequence of
//! remote calls against a credential pool.
//!
//! # Retry policy
//!
//! - not found: the target is invalid, reported as `Error::InvalidTarget`
//! - API error: rotate to the next credential; after a full round, cool down
//! - local error: logged and reported as `Error::Abandoned`, so the caller
//!   keeps its cursor and retries next cycle
//!
//! Queries without a `since_id`/`max_id` bound are paginated backwards until
//! the item target is reached or the API returns an empty page.

mod executor;
mod types;

pub use executor::FetchExecutor;
pub use types::{FetchConfig, FetchStats, DEFAULT_ITEM_TARGET};
