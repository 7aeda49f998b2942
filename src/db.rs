//! SQLite connection helpers shared by the stores.

use anyhow::{Context, Result};
use rusqlite::{ffi, Connection};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection configured for concurrent request handling.
///
/// Writers wait on the busy timeout instead of failing with `SQLITE_BUSY`.
pub fn open_connection(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .context("Failed to enable WAL journal")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Column name of a violated UNIQUE constraint, e.g. `email` for
/// "UNIQUE constraint failed: users.email".
pub fn unique_violation_column(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(code, Some(message))
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
            let first = columns.split(',').next()?.trim();
            let column = first.rsplit('.').next().unwrap_or(first);
            Some(column.to_string())
        }
        _ => None,
    }
}
