//! Base store row types shared by the aggregate and marker code

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of declaration a signature was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    Function,
    Event,
    Error,
}

impl SignatureKind {
    pub fn all() -> [SignatureKind; 3] {
        [SignatureKind::Function, SignatureKind::Event, SignatureKind::Error]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Function => "function",
            SignatureKind::Event => "event",
            SignatureKind::Error => "error",
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSignatureKind(pub String);

impl fmt::Display for UnknownSignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown signature kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownSignatureKind {}

impl FromStr for SignatureKind {
    type Err = UnknownSignatureKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "function" => Ok(SignatureKind::Function),
            "event" => Ok(SignatureKind::Event),
            "error" => Ok(SignatureKind::Error),
            _ => Err(UnknownSignatureKind(s.to_string())),
        }
    }
}

impl ToSql for SignatureKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SignatureKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Provenance source of a signature mapping, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Github,
    Etherscan,
    Fourbyte,
}

impl SourceKind {
    pub fn all() -> [SourceKind; 3] {
        [SourceKind::Github, SourceKind::Etherscan, SourceKind::Fourbyte]
    }

    pub fn mapping_table(&self) -> &'static str {
        match self {
            SourceKind::Github => "mapping_signature_github",
            SourceKind::Etherscan => "mapping_signature_etherscan",
            SourceKind::Fourbyte => "mapping_signature_fourbyte",
        }
    }
}

/// The single `github_crawler_metadata` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlerMarker {
    pub last_user_check: DateTime<Utc>,
    pub last_repository_check: DateTime<Utc>,
    pub last_repository_search: DateTime<Utc>,
}

/// Convert a stored Unix timestamp, rejecting out-of-range values
pub(crate) fn timestamp_to_datetime(secs: i64) -> FromSqlResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(FromSqlError::OutOfRange(secs))
}
