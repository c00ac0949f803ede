//! Read side of the aggregation store

use super::types::{
    AggregateSnapshot, CountSummary, InsertRate, KindCount, PopularSignature, RefreshLogEntry,
};
use crate::store::models::timestamp_to_datetime;
use rusqlite::{Connection, OptionalExtension};

pub struct AggregateReader<'a> {
    connection: &'a Connection,
}

impl<'a> AggregateReader<'a> {
    pub fn new(connection: &'a Connection) -> Self {
        AggregateReader { connection }
    }

    pub fn insert_rate(&self) -> rusqlite::Result<Vec<InsertRate>> {
        let mut stmt = self
            .connection
            .prepare("SELECT date, count FROM _aggregate_insert_rate ORDER BY date ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(InsertRate {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    pub fn popular_on_github(&self) -> rusqlite::Result<Vec<PopularSignature>> {
        let mut stmt = self
            .connection
            .prepare("SELECT text, count FROM _aggregate_popular_on_github ORDER BY rank ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(PopularSignature {
                text: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    pub fn kind_distribution(&self) -> rusqlite::Result<Vec<KindCount>> {
        let mut stmt = self
            .connection
            .prepare("SELECT kind, count FROM _aggregate_kind_distribution ORDER BY kind ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(KindCount {
                kind: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    /// None until the first refresh has committed
    pub fn count_summary(&self) -> rusqlite::Result<Option<CountSummary>> {
        self.connection
            .query_row(
                "SELECT signature_count,
                        signature_count_github, signature_count_etherscan, signature_count_fourbyte,
                        average_daily_signature_insert_rate_last_week,
                        average_daily_signature_insert_rate_week_before_last
                 FROM _aggregate_count_summary WHERE id = 1",
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
            .optional()
    }

    /// Read all four aggregates from one refresh generation
    ///
    /// The reads share a single deferred transaction; under WAL that pins one
    /// snapshot, so a refresh committing mid-read is not observed.
    pub fn snapshot(&self) -> rusqlite::Result<AggregateSnapshot> {
        let tx = self.connection.unchecked_transaction()?;

        let snapshot = AggregateSnapshot {
            insert_rate: self.insert_rate()?,
            popular_on_github: self.popular_on_github()?,
            kind_distribution: self.kind_distribution()?,
            count_summary: self.count_summary()?,
        };

        tx.commit()?;
        Ok(snapshot)
    }

    pub fn refresh_log(&self) -> rusqlite::Result<Vec<RefreshLogEntry>> {
        let mut stmt = self.connection.prepare(
            "SELECT aggregate, refresh_count, refreshed_at
             FROM _aggregate_refresh_log ORDER BY aggregate ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let secs: i64 = row.get(2)?;
            Ok(RefreshLogEntry {
                aggregate: row.get(0)?,
                refresh_count: row.get(1)?,
                refreshed_at: timestamp_to_datetime(secs).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Integer,
                        Box::new(e),
                    )
                })?,
            })
        })?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::apply_schema;

    #[test]
    fn test_empty_store_reads_empty() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let snapshot = AggregateReader::new(&conn).snapshot().unwrap();
        assert!(snapshot.insert_rate.is_empty());
        assert!(snapshot.popular_on_github.is_empty());
        assert!(snapshot.kind_distribution.is_empty());
        assert!(snapshot.count_summary.is_none());
    }

    #[test]
    fn test_snapshot_serializes_with_api_field_names() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO _aggregate_count_summary VALUES (1, 3, 2, 1, 0, 0, NULL, 0);
             INSERT INTO _aggregate_kind_distribution VALUES ('function', 3);",
        )
        .unwrap();

        let snapshot = AggregateReader::new(&conn).snapshot().unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["count_summary"]["signature_count"], 3);
        assert!(json["count_summary"]["average_daily_signature_insert_rate_week_before_last"].is_null());
        assert_eq!(json["kind_distribution"][0]["kind"], "function");
    }
}
