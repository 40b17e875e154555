//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot backends and
//! associated error types.

use crate::jobs::CrawlJob;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot backend implementations
pub trait Storage: Send {
    /// Replaces the stored list with `jobs`
    ///
    /// # Arguments
    ///
    /// * `jobs` - Completed jobs, most recent first
    fn save_completed(&mut self, jobs: &[CrawlJob]) -> StorageResult<()>;

    /// Loads the stored list, most recent first
    ///
    /// Fails on the first record that cannot be decoded.
    fn load_completed(&self) -> StorageResult<Vec<CrawlJob>>;

    /// Removes every stored job
    fn clear_completed(&mut self) -> StorageResult<()>;
}
