//! `github_crawler_metadata` handler
//!
//! The marker row carries the crawler's watermarks. Updating
//! `last_repository_search` is the one event that rebuilds the aggregation
//! store. The rebuild is a database trigger on that column, so it runs inside
//! the UPDATE whether it comes from this handler or from plain SQL; either
//! both land or neither does. The other two watermarks are plain updates.

use super::models::{timestamp_to_datetime, CrawlerMarker};
use crate::aggregates::refresh::{log_summary, read_summary, RefreshError, RefreshSummary};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("github_crawler_metadata has no row with id = 1")]
    MarkerMissing,

    #[error("Marker update rolled back, aggregate refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub struct CrawlerMarkerHandler<'a> {
    connection: &'a mut Connection,
}

impl<'a> CrawlerMarkerHandler<'a> {
    pub fn new(connection: &'a mut Connection) -> Self {
        CrawlerMarkerHandler { connection }
    }

    pub fn get(&self) -> Result<CrawlerMarker, MarkerError> {
        let marker = self
            .connection
            .query_row(
                "SELECT last_user_check, last_repository_check, last_repository_search
                 FROM github_crawler_metadata WHERE id = 1",
                [],
                |row| {
                    Ok(CrawlerMarker {
                        last_user_check: read_timestamp(row, 0)?,
                        last_repository_check: read_timestamp(row, 1)?,
                        last_repository_search: read_timestamp(row, 2)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => MarkerError::MarkerMissing,
                other => MarkerError::Database(other),
            })?;

        Ok(marker)
    }

    /// Record a repository search and rebuild every aggregate
    ///
    /// The refresh trigger runs inside the UPDATE, against the database
    /// clock. A failing rebuild aborts the UPDATE, so the marker keeps its
    /// previous value.
    pub fn update_last_repository_search(
        &mut self,
        date: DateTime<Utc>,
    ) -> Result<RefreshSummary, MarkerError> {
        let started = std::time::Instant::now();
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx
            .execute(
                "UPDATE github_crawler_metadata SET last_repository_search = ?1 WHERE id = 1",
                params![date.timestamp()],
            )
            .map_err(RefreshError::Rebuild)?;
        if updated == 0 {
            return Err(MarkerError::MarkerMissing);
        }

        let summary = read_summary(&tx)?;
        tx.commit()?;

        log::info!("🔄 Repository search recorded at {}", date.to_rfc3339());
        log_summary(&summary, started.elapsed());

        Ok(summary)
    }

    pub fn update_last_repository_check(&mut self, date: DateTime<Utc>) -> Result<(), MarkerError> {
        self.set_watermark("last_repository_check", date)
    }

    pub fn update_last_user_check(&mut self, date: DateTime<Utc>) -> Result<(), MarkerError> {
        self.set_watermark("last_user_check", date)
    }

    fn set_watermark(&mut self, column: &'static str, date: DateTime<Utc>) -> Result<(), MarkerError> {
        let sql = format!("UPDATE github_crawler_metadata SET {} = ?1 WHERE id = 1", column);
        match self.connection.execute(&sql, params![date.timestamp()])? {
            0 => Err(MarkerError::MarkerMissing),
            _ => Ok(()),
        }
    }
}

fn read_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    timestamp_to_datetime(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e)))
}
