//! Print the current aggregates as JSON on stdout
//!
//! ## Environment Variables
//!
//! - SIGFLOW_DB_PATH - SQLite database path (required)

use clap::Parser;
use serde::Serialize;
use sigflow::aggregates::{AggregateReader, AggregateSnapshot, RefreshLogEntry};
use sigflow::config::DatabaseConfig;
use sigflow::store::{open_read_only, CrawlerMarker, CrawlerMarkerHandler};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sigflow-stats", about = "Print aggregate statistics as JSON")]
struct Args {
    /// Include the crawler marker and per-aggregate refresh log
    #[arg(long)]
    verbose: bool,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    aggregates: AggregateSnapshot,

    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<CrawlerMarker>,

    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_log: Option<Vec<RefreshLogEntry>>,
}

fn collect(args: &Args, db_path: &std::path::Path) -> Result<StatsOutput, Box<dyn std::error::Error>> {
    let mut conn = open_read_only(db_path)?;

    let (aggregates, refresh_log) = {
        let reader = AggregateReader::new(&conn);
        let refresh_log = if args.verbose {
            Some(reader.refresh_log()?)
        } else {
            None
        };
        (reader.snapshot()?, refresh_log)
    };

    let marker = if args.verbose {
        Some(CrawlerMarkerHandler::new(&mut conn).get()?)
    } else {
        None
    };

    Ok(StatsOutput {
        aggregates,
        marker,
        refresh_log,
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    let output = match collect(&args, &config.db_path) {
        Ok(output) => output,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };

    match json {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
