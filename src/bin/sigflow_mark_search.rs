//! Record a repository search on the crawler marker
//!
//! Same write the crawler performs after each search run, so it also
//! rebuilds every aggregate. Operators use it to force a refresh.
//!
//! ## Environment Variables
//!
//! - SIGFLOW_DB_PATH - SQLite database path (required)
//! - RUST_LOG - Logging level (optional, default: info)

use chrono::{DateTime, Utc};
use clap::Parser;
use sigflow::config::DatabaseConfig;
use sigflow::store::{apply_schema, open_database, CrawlerMarkerHandler};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sigflow-mark-search", about = "Record a repository search and refresh aggregates")]
struct Args {
    /// Search time (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_rfc3339)]
    at: Option<DateTime<Utc>>,
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {}", e))
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    let mut conn = match open_database(&config.db_path) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = apply_schema(&conn) {
        log::error!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    let at = args.at.unwrap_or_else(Utc::now);
    let mut marker = CrawlerMarkerHandler::new(&mut conn);

    match marker.update_last_repository_search(at) {
        Ok(summary) => {
            log::info!(
                "✅ Search recorded at {}, aggregates cover {} signatures",
                at.to_rfc3339(),
                summary.signature_count
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
