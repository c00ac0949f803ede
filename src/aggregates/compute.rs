//! Aggregate computations over the base store
//!
//! Each aggregate is defined once, as a `_compute_*` view in
//! `sql/01_aggregates.sql`, evaluated against the database clock. The refresh
//! trigger copies the views into the aggregate tables; these functions read
//! the views directly so callers can compare the stored generation with a
//! fresh computation.

use super::types::{CountSummary, InsertRate, KindCount, PopularSignature};
use rusqlite::Connection;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// UTC days covered by the insert-rate history, today included
pub const INSERT_RATE_WINDOW_DAYS: i64 = 31;

/// How many signatures the popularity ranking keeps
pub const POPULAR_LIMIT: i64 = 100;

/// Signatures added per UTC day, today and the 30 days before, oldest first
pub fn compute_insert_rate(conn: &Connection) -> rusqlite::Result<Vec<InsertRate>> {
    let mut stmt = conn.prepare("SELECT date, count FROM _compute_insert_rate ORDER BY date ASC")?;

    let rows = stmt.query_map([], |row| {
        Ok(InsertRate {
            date: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    rows.collect()
}

/// Top 100 signature texts by number of GitHub mappings
pub fn compute_popular_on_github(conn: &Connection) -> rusqlite::Result<Vec<PopularSignature>> {
    let mut stmt =
        conn.prepare("SELECT text, count FROM _compute_popular_on_github ORDER BY rank ASC")?;

    let rows = stmt.query_map([], |row| {
        Ok(PopularSignature {
            text: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    rows.collect()
}

/// Signatures per kind, from `mapping_signature_kind`
///
/// A text that is both an event and an error counts once for each.
pub fn compute_kind_distribution(conn: &Connection) -> rusqlite::Result<Vec<KindCount>> {
    let mut stmt =
        conn.prepare("SELECT kind, count FROM _compute_kind_distribution ORDER BY kind ASC")?;

    let rows = stmt.query_map([], |row| {
        Ok(KindCount {
            kind: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    rows.collect()
}

/// Totals per source and the rolling weekly insert averages
///
/// Last week is `(now - 7d, now]`, the week before last is
/// `(now - 14d, now - 7d)`.
pub fn compute_count_summary(conn: &Connection) -> rusqlite::Result<CountSummary> {
    conn.query_row(
        "SELECT signature_count,
                signature_count_github, signature_count_etherscan, signature_count_fourbyte,
                average_daily_signature_insert_rate_last_week,
                average_daily_signature_insert_rate_week_before_last
         FROM _compute_count_summary",
        [],
        |row| {
            Ok(CountSummary {
                signature_count: row.get(0)?,
                signature_count_github: row.get(1)?,
                signature_count_etherscan: row.get(2)?,
                signature_count_fourbyte: row.get(3)?,
                average_daily_signature_insert_rate_last_week: row.get(4)?,
                average_daily_signature_insert_rate_week_before_last: row.get(5)?,
            })
        },
    )
}
