//! Aggregate row types
//!
//! These are what the query API serves; they serialize with the same field
//! names the statistics endpoints always used.

use crate::store::SignatureKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Signatures added on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertRate {
    pub date: NaiveDate,
    pub count: i64,
}

/// A signature text and how many GitHub mappings reference it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularSignature {
    pub text: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: SignatureKind,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    pub signature_count: i64,
    pub signature_count_github: i64,
    pub signature_count_etherscan: i64,
    pub signature_count_fourbyte: i64,
    pub average_daily_signature_insert_rate_last_week: i64,
    /// None while the prior week holds no signatures
    pub average_daily_signature_insert_rate_week_before_last: Option<i64>,
}

/// All four aggregates as read in one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateSnapshot {
    pub insert_rate: Vec<InsertRate>,
    pub popular_on_github: Vec<PopularSignature>,
    pub kind_distribution: Vec<KindCount>,
    /// None until the first refresh
    pub count_summary: Option<CountSummary>,
}

/// The four aggregates, in refresh order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateName {
    InsertRate,
    PopularOnGithub,
    KindDistribution,
    CountSummary,
}

impl AggregateName {
    pub fn all() -> [AggregateName; 4] {
        [
            AggregateName::InsertRate,
            AggregateName::PopularOnGithub,
            AggregateName::KindDistribution,
            AggregateName::CountSummary,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateName::InsertRate => "insert_rate",
            AggregateName::PopularOnGithub => "popular_on_github",
            AggregateName::KindDistribution => "kind_distribution",
            AggregateName::CountSummary => "count_summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshLogEntry {
    pub aggregate: String,
    pub refresh_count: i64,
    pub refreshed_at: DateTime<Utc>,
}
