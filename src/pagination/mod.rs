//! Pagination module
//!
//! Turns a single unbounded query into a lazy sequence of id-bounded pages.
//!
//! # Overview
//!
//! The remote API pages backwards through time: each page is requested with
//! a backward cursor just below the oldest record already seen. The fetch
//! executor uses this for queries that carry no cursor of their own.

mod pages;

pub use pages::{collect_pages, next_page_query, pages};
