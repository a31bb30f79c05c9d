//! `minewatch` command-line entry point.

use clap::Parser;
use minewatch_runner::cli::{execute, Args};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    minewatch_metrics::describe_metrics();

    match execute(&args) {
        Ok(report) => {
            let meta = &report.metadata;
            info!(
                sites = meta.total_sites,
                legal = meta.legal_sites,
                illegal = meta.illegal_sites,
                skipped = meta.skipped.len(),
                total_area_ha = meta.total_area_hectares,
                total_volume_m3 = meta.total_volume_m3,
                "Run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
