mod error;
mod run_config;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{debug, error, info};

use crate::run_config::RunConfig;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting chunkbrot");

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => RunConfig::load(&path).unwrap_or_else(|e| {
            error!("{e}; falling back to defaults");
            RunConfig::default()
        }),
        None => {
            debug!("No run configuration given, using defaults");
            RunConfig::default()
        }
    };

    match runner::run(&config) {
        Ok(summary) => {
            info!(
                passes = summary.passes_run,
                settled = summary.settled,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
