//! Database schema and migrations.

use rusqlite::Connection;
use tracing::warn;

use super::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Initialize the database schema.
///
/// Databases from an older version are dropped and rebuilt; reminders do not
/// survive a schema change.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version != SCHEMA_VERSION {
        warn!(
            "Schema version {} does not match {}, recreating reminders table",
            version, SCHEMA_VERSION
        );
        conn.execute_batch("DROP TABLE IF EXISTS reminders;")?;
        create_schema(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reminders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            repeat_mode TEXT NOT NULL DEFAULT 'ONCE',
            category TEXT NOT NULL DEFAULT 'Personal'
        );
        "#,
    )?;

    Ok(())
}
