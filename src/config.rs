//! Configuration from environment variables
//!
//! Each binary loads the one struct it needs, once, before doing any work.
//! `.env` is read first when present. An empty value counts as unset.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DB_PATH_VAR: &str = "SIGFLOW_DB_PATH";
pub const DESTINATION_VAR: &str = "SIGFLOW_EXPORT_DESTINATION";
pub const DESTINATION_TOKEN_VAR: &str = "SIGFLOW_DESTINATION_TOKEN";
pub const CONCURRENCY_VAR: &str = "SIGFLOW_EXPORT_CONCURRENCY";
pub const PROJECT_VAR: &str = "SIGFLOW_WAREHOUSE_PROJECT";
pub const DATASET_VAR: &str = "SIGFLOW_WAREHOUSE_DATASET";

pub const DEFAULT_EXPORT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(&'static str),

    #[error("Invalid value for {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        reason: String,
    },
}

/// Where the base store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub database: DatabaseConfig,

    /// Root that `<table>.csv` objects are written under
    pub destination: String,

    /// Bearer token for HTTP destinations
    pub destination_token: Option<String>,

    /// Upper bound on tables exported at once
    pub concurrency: usize,
}

/// Target of the emitted table declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarConfig {
    pub project: String,
    pub dataset: String,
}

fn load_dotenv() {
    // Missing .env is the normal case in production
    if let Ok(path) = dotenv::dotenv() {
        log::debug!("Loaded {}", path.display());
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn optional<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::MissingVariable(name))
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            db_path: PathBuf::from(required(&lookup, DB_PATH_VAR)?),
        })
    }
}

impl ExportConfig {
    /// Environment variables:
    /// - `SIGFLOW_DB_PATH` (required)
    /// - `SIGFLOW_EXPORT_DESTINATION` (required): directory, `file://` or `http(s)://` root
    /// - `SIGFLOW_DESTINATION_TOKEN` (optional)
    /// - `SIGFLOW_EXPORT_CONCURRENCY` (default: 4)
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig::from_lookup(&lookup)?;
        let destination = required(&lookup, DESTINATION_VAR)?;
        let destination_token = optional(&lookup, DESTINATION_TOKEN_VAR);

        let concurrency = match optional(&lookup, CONCURRENCY_VAR) {
            None => DEFAULT_EXPORT_CONCURRENCY,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        variable: CONCURRENCY_VAR,
                        reason: format!("expected a positive integer, got '{}'", raw),
                    })
                }
            },
        };

        Ok(Self {
            database,
            destination,
            destination_token,
            concurrency,
        })
    }
}

impl RegistrarConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            project: required(&lookup, PROJECT_VAR)?,
            dataset: required(&lookup, DATASET_VAR)?,
        })
    }
}
