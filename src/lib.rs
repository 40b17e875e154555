//! Price-Sweep: branch price aggregation for retail product pages
//!
//! This crate takes a product page, fetches that product's price at every
//! configured store branch with bounded parallelism, and reports a ranked
//! price list either interactively or through a queued background job.

pub mod admission;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod output;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

#[cfg(test)]
mod testing;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Price-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Session error: {0}")]
    Session(#[from] crawler::SessionError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Request rejected: {0}")]
    Rejected(#[from] admission::AdmissionRejected),

    #[error("Crawling is disabled for another {}s after too many errors", retry_after.as_secs())]
    Disabled { retry_after: Duration },

    #[error("No browser session could be created for {url}")]
    NoSessions { url: String },

    #[error("Crawl failed for {url}: {message}")]
    Crawl { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Price-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BranchPrice, BranchResult, CrawlOrchestrator, CrawlResult, Price};
pub use jobs::{CrawlJob, JobId};
pub use service::{PriceService, Submission};
pub use url::{normalize_product_url, ProductUrl};
