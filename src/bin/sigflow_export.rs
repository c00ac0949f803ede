//! Export every user table of the signature database as `<table>.csv`
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin sigflow-export
//! ```
//!
//! ## Environment Variables
//!
//! - SIGFLOW_DB_PATH - SQLite database path (required)
//! - SIGFLOW_EXPORT_DESTINATION - directory, file:// or http(s):// root (required)
//! - SIGFLOW_DESTINATION_TOKEN - bearer token for HTTP destinations (optional)
//! - SIGFLOW_EXPORT_CONCURRENCY - tables exported at once (default: 4)
//! - RUST_LOG - Logging level (optional, default: info)
//!
//! Exit codes: 0 all tables exported, 1 one or more tables failed (or the
//! run could not start), 2 configuration error.

use clap::Parser;
use sigflow::config::ExportConfig;
use sigflow::export::{run_export, sink_for_destination};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sigflow-export", about = "Export base tables to the warehouse staging area")]
struct Args {
    /// Override SIGFLOW_EXPORT_CONCURRENCY
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match ExportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };
    let concurrency = args.concurrency.unwrap_or(config.concurrency).max(1);

    let sink = match sink_for_destination(&config.destination, config.destination_token.clone()) {
        Ok(sink) => sink,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    log::info!("🚀 Starting export");
    log::info!("   Database: {}", config.database.db_path.display());
    log::info!("   Destination: {}", sink.describe());
    log::info!("   Concurrency: {}", concurrency);

    let report = match run_export(&config.database.db_path, sink, concurrency).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("❌ Export aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if report.is_success() {
        log::info!("✅ Exported {} tables", report.succeeded.len());
        return ExitCode::SUCCESS;
    }

    eprintln!(
        "{} of {} tables failed:",
        report.failed.len(),
        report.failed.len() + report.succeeded.len()
    );
    for failure in &report.failed {
        eprintln!("  {}: {}", failure.table, failure.error);
    }
    ExitCode::FAILURE
}
