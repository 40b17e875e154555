//! Result cache module for Price-Sweep
//!
//! Crawl results are memoized per normalized product URL for a fixed TTL.
//! Concurrent requests for the same URL share a single crawl.

mod entry;
mod result_cache;

pub use entry::CacheEntry;
pub use result_cache::ResultCache;
