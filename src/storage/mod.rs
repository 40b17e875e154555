//! Storage module for the completed-job snapshot
//!
//! This module persists the recently completed jobs so the list survives a
//! restart. The snapshot is best-effort:
//! - SQLite database initialization and schema management
//! - Whole-list rewrite after every completed job
//! - Loading the list at startup

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a snapshot database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}
