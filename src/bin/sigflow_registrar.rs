//! Print one warehouse table declaration per schema file
//!
//! ## Usage
//!
//! ```bash
//! sigflow-registrar schemas/ | sh
//! ```
//!
//! ## Environment Variables
//!
//! - SIGFLOW_WAREHOUSE_PROJECT - destination project (required)
//! - SIGFLOW_WAREHOUSE_DATASET - destination dataset (required)
//!
//! Nothing is printed unless both are set and the directory is readable.
//! Exit codes: 0 success, 1 I/O error, 2 configuration error.

use clap::Parser;
use sigflow::config::RegistrarConfig;
use sigflow::registrar::{declarations_for_dir, write_declarations};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sigflow-registrar", about = "Emit warehouse table declarations for schema files")]
struct Args {
    /// Directory holding one schema file per table
    schema_dir: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match RegistrarConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    let declarations = match declarations_for_dir(&config, &args.schema_dir) {
        Ok(declarations) => declarations,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    if declarations.is_empty() {
        log::warn!("⚠️  No schema files in {}", args.schema_dir.display());
    }

    let stdout = std::io::stdout();
    if let Err(e) = write_declarations(&mut stdout.lock(), &declarations) {
        log::error!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    log::info!(
        "✅ {} declarations for {}:{}",
        declarations.len(),
        config.project,
        config.dataset
    );
    ExitCode::SUCCESS
}
