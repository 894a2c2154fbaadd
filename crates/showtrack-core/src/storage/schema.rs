//! SQLite schema for the local store
//!
//! One table per tracked entity type, the `sync` table holding the
//! change ledger, and a key/value `settings` table for the device
//! identity and last sync time.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS programs (
            id TEXT PRIMARY KEY,
            program_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS series (
            id TEXT PRIMARY KEY,
            series_name TEXT NOT NULL,
            now_showing INTEGER,
            program_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS episodes (
            id TEXT PRIMARY KEY,
            episode_name TEXT NOT NULL,
            series_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT '',
            status_date TEXT NOT NULL DEFAULT '',
            unverified INTEGER NOT NULL DEFAULT 0,
            unscheduled INTEGER NOT NULL DEFAULT 0,
            sequence INTEGER NOT NULL DEFAULT 0
        );

        -- Local change ledger: one row per entity changed since the last export
        CREATE TABLE IF NOT EXISTS sync (
            type TEXT NOT NULL,
            id TEXT NOT NULL,
            action TEXT NOT NULL,
            PRIMARY KEY (type, id)
        );

        CREATE TABLE IF NOT EXISTS settings (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_series_program_id ON series(program_id);
        CREATE INDEX IF NOT EXISTS idx_episodes_series_id ON episodes(series_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
