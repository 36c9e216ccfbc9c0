//! Store file creation and format versioning.
//!
//! The fixed part of the store is the album master table plus a format
//! version table. Per-album tables are created by the album operations.

use std::path::Path;

use rusqlite::Connection;

use crate::error::StoreError;

/// Current store format. Increment when the fixed tables change.
pub const CURRENT_VERSION: i32 = 1;

pub const MASTER_TABLE: &str = "album_master_table";

/// Create the fixed tables if they don't exist.
///
/// Safe to call on an existing store.
pub fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA_SQL)?;
    if get_schema_version(conn)? == 0 {
        set_schema_version(conn, CURRENT_VERSION)?;
    }
    Ok(())
}

/// Open or create a store file at the given path.
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version > CURRENT_VERSION {
        return Err(StoreError::UnsupportedFormat {
            found: version,
            supported: CURRENT_VERSION,
        });
    }
    create_schema(&conn)?;

    Ok(conn)
}

/// Open an in-memory store with the fixed tables. Useful for testing.
pub fn open_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the store format version, or 0 if the store is new.
pub fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Whether a table of the given name exists.
pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

const SCHEMA_SQL: &str = r#"
-- Store format tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per album
CREATE TABLE IF NOT EXISTS album_master_table (
    id INTEGER PRIMARY KEY,
    album_name TEXT NOT NULL,
    album_table_name TEXT NOT NULL UNIQUE,
    type_info_table_name TEXT NOT NULL UNIQUE,
    has_pictures INTEGER NOT NULL DEFAULT 0
);
"#;
