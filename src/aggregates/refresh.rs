//! Wholesale aggregate refresh
//!
//! The rebuild itself lives in the database: the
//! `_aggregate_refresh_on_repository_search` trigger empties and refills the
//! four aggregate tables in order (insert rate, popular on GitHub, kind
//! distribution, count summary) and bumps `_aggregate_refresh_log`, inside
//! whatever statement updates `github_crawler_metadata.last_repository_search`.
//! A crawler writing the marker with plain SQL gets the same refresh as
//! [`crate::store::CrawlerMarkerHandler`].
//!
//! Readers on other connections keep seeing the previous generation until
//! the updating transaction commits.

use rusqlite::{Connection, Transaction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Aggregate rebuild aborted the marker update: {0}")]
    Rebuild(#[source] rusqlite::Error),

    #[error("Reading the rebuilt aggregates failed: {0}")]
    Summary(#[source] rusqlite::Error),
}

/// Row counts written by one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub insert_rate_rows: usize,
    pub popular_rows: usize,
    pub kind_rows: usize,
    pub signature_count: i64,
    /// The database clock the aggregates were computed against
    pub refreshed_at: i64,
}

/// Rebuild every aggregate without moving the marker
///
/// Rewrites `last_repository_search` with its current value, which fires the
/// refresh trigger. The caller owns the transaction; on error dropping it
/// discards the partial work.
pub fn refresh_all(tx: &Transaction<'_>) -> Result<RefreshSummary, RefreshError> {
    let started = std::time::Instant::now();

    tx.execute(
        "UPDATE github_crawler_metadata
         SET last_repository_search = last_repository_search
         WHERE id = 1",
        [],
    )
    .map_err(RefreshError::Rebuild)?;

    let summary = read_summary(tx)?;
    log_summary(&summary, started.elapsed());
    Ok(summary)
}

/// Row counts of the generation currently visible to `conn`
pub fn read_summary(conn: &Connection) -> Result<RefreshSummary, RefreshError> {
    conn.query_row(
        "SELECT
             (SELECT COUNT(*) FROM _aggregate_insert_rate),
             (SELECT COUNT(*) FROM _aggregate_popular_on_github),
             (SELECT COUNT(*) FROM _aggregate_kind_distribution),
             signature_count,
             computed_at
         FROM _aggregate_count_summary WHERE id = 1",
        [],
        |row| {
            Ok(RefreshSummary {
                insert_rate_rows: row.get::<_, i64>(0)? as usize,
                popular_rows: row.get::<_, i64>(1)? as usize,
                kind_rows: row.get::<_, i64>(2)? as usize,
                signature_count: row.get(3)?,
                refreshed_at: row.get(4)?,
            })
        },
    )
    .map_err(RefreshError::Summary)
}

pub(crate) fn log_summary(summary: &RefreshSummary, elapsed: std::time::Duration) {
    log::info!("📊 Aggregates rebuilt in {:?}", elapsed);
    log::info!("   ├─ insert_rate: {} days", summary.insert_rate_rows);
    log::info!("   ├─ popular_on_github: {} signatures", summary.popular_rows);
    log::info!("   ├─ kind_distribution: {} kinds", summary.kind_rows);
    log::info!("   └─ count_summary: {} signatures total", summary.signature_count);
}
