//! Base store access
//!
//! The base store (signatures, provenance mappings, crawler marker) is owned
//! by the crawler. This module opens connections to it, applies the embedded
//! schema and exposes the marker handler, the only write path sigflow has
//! into base tables.

pub mod marker;
pub mod models;

pub use marker::CrawlerMarkerHandler;
pub use models::{CrawlerMarker, SignatureKind, SourceKind};

use crate::sqlite_pragma::{apply_optimized_pragmas, apply_reader_pragmas};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Schema files, applied in order. Each one is idempotent.
pub const SCHEMA_FILES: &[(&str, &str)] = &[
    ("00_base_store.sql", include_str!("../../sql/00_base_store.sql")),
    ("01_aggregates.sql", include_str!("../../sql/01_aggregates.sql")),
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Schema file {file} failed: {source}")]
    Schema {
        file: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Open a read-write connection, creating the file (and its directory) if needed
pub fn open_database(db_path: impl AsRef<Path>) -> Result<Connection, StoreError> {
    let db_path = db_path.as_ref();

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open(db_path).map_err(|source| StoreError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;
    apply_optimized_pragmas(&conn)?;

    Ok(conn)
}

/// Open a connection that cannot write
///
/// The file must already exist. Export and stats readers use this so they
/// never take a write lock on the base store. It is opened read-write at the
/// file level, so WAL readers can map the shared-memory index, and refuses
/// writes through `query_only`; the store's journal mode is left untouched.
pub fn open_read_only(db_path: impl AsRef<Path>) -> Result<Connection, StoreError> {
    let db_path = db_path.as_ref();

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags).map_err(|source| StoreError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;
    apply_reader_pragmas(&conn)?;

    Ok(conn)
}

/// Apply every embedded schema file in order
pub fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    log::debug!("🔧 Applying schema ({} files)", SCHEMA_FILES.len());

    for &(file, sql) in SCHEMA_FILES {
        conn.execute_batch(sql)
            .map_err(|source| StoreError::Schema { file, source })?;
        log::debug!("   └─ ✅ {}", file);
    }

    Ok(())
}
