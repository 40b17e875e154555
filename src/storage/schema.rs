//! Database schema definitions
//!
//! This module contains the SQL schema for the completed-job snapshot.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Recently completed jobs, most recent first by completed_at
CREATE TABLE IF NOT EXISTS completed_jobs (
    id TEXT PRIMARY KEY,
    product_url TEXT NOT NULL,
    contacts TEXT NOT NULL,
    created_at TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    success INTEGER NOT NULL,
    product_name TEXT,
    product_image TEXT,
    result_body TEXT
);

CREATE INDEX IF NOT EXISTS idx_completed_jobs_completed_at ON completed_jobs(completed_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
