//! Shared crawl state
//!
//! This module holds the process-wide state that outlives a single crawl.
//!
//! # Components
//!
//! - `StatusTracker`: Live per-URI progress strings for in-flight crawls
//! - `CircuitBreaker`: The "disabled until" timestamp armed after too many errors

mod circuit;
mod status;

// Re-export main types
pub use circuit::CircuitBreaker;
pub use status::{StatusGuard, StatusTracker};
