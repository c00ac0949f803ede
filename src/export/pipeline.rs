//! Export run: discover → extract/escape → deliver, one worker per table

use super::body::{object_body, BodyWriter};
use super::discovery::list_exportable_tables;
use super::extract::{write_table, ExtractError};
use super::sink::{ObjectSink, SinkError};
use crate::store::{open_read_only, StoreError};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;

pub const OBJECT_EXTENSION: &str = "csv";

/// Run-level failure; nothing was exported
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to open database: {0}")]
    Open(#[from] StoreError),

    #[error("Table discovery failed: {0}")]
    Discovery(#[source] rusqlite::Error),
}

/// Failure of a single table; siblings are unaffected
#[derive(Debug, Error)]
pub enum TableExportError {
    #[error("{0}")]
    Open(#[from] StoreError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Delivery failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Worker aborted: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableExport {
    pub table: String,
    /// Where the sink put the object
    pub object: String,
    pub rows: u64,
    pub bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct TableFailure {
    pub table: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: TableExportError,
}

fn serialize_display<S: serde::Serializer>(
    error: &TableExportError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Per-table outcome of a run, each list ordered by table name
#[derive(Debug, Default, Serialize)]
pub struct ExportReport {
    pub succeeded: Vec<TableExport>,
    pub failed: Vec<TableFailure>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_tables(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.table.as_str()).collect()
    }
}

pub fn object_name(table: &str) -> String {
    format!("{}.{}", table, OBJECT_EXTENSION)
}

/// Export every exportable table of the database at `db_path` into `sink`
///
/// At most `concurrency` tables are in flight at once. Each worker opens its
/// own read-only connection on the blocking pool and streams rows to the sink
/// while it reads them, so exports never hold a write lock and no table is
/// ever held in memory whole.
pub async fn run_export(
    db_path: impl AsRef<Path>,
    sink: Arc<dyn ObjectSink>,
    concurrency: usize,
) -> Result<ExportReport, ExportError> {
    let db_path = db_path.as_ref().to_path_buf();
    let started = Instant::now();

    let tables = {
        let conn = open_read_only(&db_path)?;
        list_exportable_tables(&conn).map_err(ExportError::Discovery)?
    };

    log::info!("📤 Exporting {} tables to {}", tables.len(), sink.describe());

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(tables.len());

    for table in tables {
        let semaphore = Arc::clone(&semaphore);
        let sink = Arc::clone(&sink);
        let db_path = db_path.clone();
        let worker_table = table.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| TableExportError::Worker(e.to_string()))?;
            export_table(&db_path, &worker_table, sink.as_ref()).await
        });
        handles.push((table, handle));
    }

    let mut report = ExportReport::default();
    for (table, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(TableExportError::Worker(join_error.to_string())),
        };

        match outcome {
            Ok(export) => {
                log::info!(
                    "   ├─ ✅ {} → {} ({} rows, {} bytes)",
                    export.table,
                    export.object,
                    export.rows,
                    export.bytes
                );
                report.succeeded.push(export);
            }
            Err(error) => {
                log::error!("   ├─ ❌ {}: {}", table, error);
                report.failed.push(TableFailure { table, error });
            }
        }
    }

    log::info!(
        "   └─ Export finished in {:.2?}: {} succeeded, {} failed",
        started.elapsed(),
        report.succeeded.len(),
        report.failed.len()
    );

    Ok(report)
}

async fn export_table(
    db_path: &Path,
    table: &str,
    sink: &dyn ObjectSink,
) -> Result<TableExport, TableExportError> {
    let (writer, body) = object_body();

    let extractor = {
        let db_path = db_path.to_path_buf();
        let table = table.to_string();
        tokio::task::spawn_blocking(move || extract_into(&db_path, &table, writer))
    };

    let uploaded = sink.put(&object_name(table), body).await;
    let extracted = extractor
        .await
        .map_err(|e| TableExportError::Worker(e.to_string()))?;

    let ((rows, bytes), object) = match (extracted, uploaded) {
        (Ok(counts), Ok(location)) => (counts, location),
        // The sink gave up first and the extractor only saw the body close
        (Err(e), Err(sink_error)) if body_closed(&e) => return Err(sink_error.into()),
        (Err(e), _) => return Err(e),
        (Ok(_), Err(sink_error)) => return Err(sink_error.into()),
    };

    Ok(TableExport {
        table: table.to_string(),
        object,
        rows,
        bytes,
    })
}

/// Extract `table` into `writer`, failing the body on any error
fn extract_into(
    db_path: &Path,
    table: &str,
    mut writer: BodyWriter,
) -> Result<(u64, u64), TableExportError> {
    let conn = match open_read_only(db_path) {
        Ok(conn) => conn,
        Err(e) => {
            writer.abort(std::io::Error::other(e.to_string()));
            return Err(e.into());
        }
    };

    match write_table(&conn, table, &mut writer) {
        Ok(rows) => {
            let bytes = writer.finish().map_err(ExtractError::Io)?;
            Ok((rows, bytes))
        }
        Err(e) => {
            writer.abort(std::io::Error::other(e.to_string()));
            Err(e.into())
        }
    }
}

fn body_closed(error: &TableExportError) -> bool {
    matches!(
        error,
        TableExportError::Extract(ExtractError::Io(io)) if io.kind() == std::io::ErrorKind::BrokenPipe
    )
}
