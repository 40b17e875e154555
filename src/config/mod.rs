//! Configuration module for Price-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use price_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling {} branches", config.branches.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AdmissionConfig, CacheConfig, Config, CrawlerConfig, QueueConfig, SelectorConfig,
    SessionConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
