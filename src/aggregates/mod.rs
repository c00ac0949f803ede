//! Aggregation store
//!
//! Four derived datasets precomputed from the base store:
//!
//! ```text
//! signature ─────────────────────────┬─► insert_rate        (per day, 31 days)
//! mapping_signature_github ──────────┼─► popular_on_github  (top 100 texts)
//! mapping_signature_kind ────────────┼─► kind_distribution  (per kind)
//! mapping_signature_{github,         │
//!   etherscan,fourbyte} ─────────────┴─► count_summary      (totals + weekly averages)
//! ```
//!
//! They are rebuilt together by a trigger on
//! `github_crawler_metadata.last_repository_search` (see [`refresh`]) and
//! read through [`reader::AggregateReader`].

pub mod compute;
pub mod reader;
pub mod refresh;
pub mod types;

pub use reader::AggregateReader;
pub use refresh::{read_summary, refresh_all, RefreshError, RefreshSummary};
pub use types::{
    AggregateName, AggregateSnapshot, CountSummary, InsertRate, KindCount, PopularSignature,
    RefreshLogEntry,
};
