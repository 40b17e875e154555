//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::jobs::CrawlJob;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::url::ProductUrl;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use url::Url;
use uuid::Uuid;

/// Contacts are stored newline separated
const CONTACT_SEPARATOR: &str = "\n";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database, including files that
    ///   are not SQLite databases
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    fn save_completed(&mut self, jobs: &[CrawlJob]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM completed_jobs", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO completed_jobs
                    (id, product_url, contacts, created_at, completed_at, success,
                     product_name, product_image, result_body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for job in jobs {
                let Some(completed_at) = job.completed_at else {
                    tracing::warn!("Skipping incomplete job {} in snapshot", job.id);
                    continue;
                };
                let contacts: Vec<&str> = job.contacts.iter().map(String::as_str).collect();

                stmt.execute(params![
                    job.id.to_string(),
                    job.product_url.as_str(),
                    contacts.join(CONTACT_SEPARATOR),
                    format_timestamp(&job.created_at),
                    format_timestamp(&completed_at),
                    job.success,
                    job.product_name,
                    job.product_image,
                    job.result_body,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_completed(&self) -> StorageResult<Vec<CrawlJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_url, contacts, created_at, completed_at, success,
                    product_name, product_image, result_body
             FROM completed_jobs ORDER BY completed_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredJob {
                id: row.get(0)?,
                product_url: row.get(1)?,
                contacts: row.get(2)?,
                created_at: row.get(3)?,
                completed_at: row.get(4)?,
                success: row.get(5)?,
                product_name: row.get(6)?,
                product_image: row.get(7)?,
                result_body: row.get(8)?,
            })
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row?.into_job()?);
        }

        Ok(jobs)
    }

    fn clear_completed(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM completed_jobs", [])?;
        Ok(())
    }
}

/// A completed_jobs row before decoding
struct StoredJob {
    id: String,
    product_url: String,
    contacts: String,
    created_at: String,
    completed_at: String,
    success: bool,
    product_name: Option<String>,
    product_image: Option<String>,
    result_body: Option<String>,
}

impl StoredJob {
    fn into_job(self) -> StorageResult<CrawlJob> {
        let corrupt = |message: String| StorageError::Corrupt {
            id: self.id.clone(),
            message,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?;
        let url = Url::parse(&self.product_url).map_err(|e| corrupt(e.to_string()))?;
        let created_at = parse_timestamp(&self.created_at).map_err(&corrupt)?;
        let completed_at = parse_timestamp(&self.completed_at).map_err(&corrupt)?;

        Ok(CrawlJob {
            id,
            product_url: ProductUrl::from_normalized(url),
            contacts: self
                .contacts
                .split(CONTACT_SEPARATOR)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            created_at,
            completed_at: Some(completed_at),
            success: self.success,
            product_name: self.product_name,
            product_image: self.product_image,
            result_body: self.result_body,
        })
    }
}

/// Fixed-width UTC timestamps, so text order is time order
fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{}': {}", value, e))
}
