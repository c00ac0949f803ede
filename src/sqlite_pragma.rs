//! Shared SQLite connection tuning
//!
//! Writer connections (marker updates, schema setup) go through
//! `apply_optimized_pragmas`. Reader connections (export, stats) go through
//! `apply_reader_pragmas`, which never writes to the database file: a reader
//! must not flip the journal mode of a store it does not own.

use rusqlite::Connection;
use std::time::Duration;

/// Pages between automatic WAL checkpoints
pub const WAL_AUTOCHECKPOINT_PAGES: i64 = 1000;

/// How long a connection waits on a locked database before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Apply the connection profile:
/// - `journal_mode = WAL` so export readers never block the refresh writer
/// - `synchronous = NORMAL` (safe under WAL)
/// - `temp_store = MEMORY`
/// - `wal_autocheckpoint = 1000`
/// - busy timeout of 5s
/// - `foreign_keys = ON`
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode reports the resulting mode; in-memory databases answer "memory"
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::debug!("SQLite journal_mode = {}", mode);

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "wal_autocheckpoint", WAL_AUTOCHECKPOINT_PAGES)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}

/// Apply the reader profile:
/// - `query_only = ON`, set first so nothing after it can write
/// - `temp_store = FILE` so ordered full-table scans spill to disk
/// - busy timeout of 5s
///
/// The journal mode is left as the owner configured it.
pub fn apply_reader_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "query_only", "ON")?;
    conn.pragma_update(None, "temp_store", "FILE")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    Ok(())
}
