//! Toko Agung POS dashboard: sales report, summary dashboard and sales entry
//! over the store's HTTP API.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod logging;
pub mod models;
pub mod report;
pub mod sequence;
pub mod session;
pub mod transaction;

#[cfg(test)]
mod testing;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use crate::cli::Cli;
use crate::config::AppConfig;

/// Process entry point for the `toko-dashboard` binary.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("toko-dashboard: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(url) = cli.api_base.as_deref() {
        config.set_api_base(url);
    }
    if let Some(operator) = cli.operator.as_deref().map(str::trim) {
        if !operator.is_empty() {
            config.operator = operator.to_string();
        }
    }

    // Dropping the guard flushes the file writer, so it lives until exit.
    let log_dir = config
        .log_dir
        .clone()
        .unwrap_or_else(logging::default_log_dir);
    let _log_guard = logging::init(&log_dir, config.log_format);

    info!(
        "Starting Toko Agung dashboard v{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_SHA")
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::execute(cli.command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "command failed");
            eprintln!("toko-dashboard: {e:#}");
            ExitCode::FAILURE
        }
    }
}
