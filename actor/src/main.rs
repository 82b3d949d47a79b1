//! t3 - TicTacToe policy network trainer
//!
//! A batch process with three subcommands:
//! 1. `generate` writes random self-play positions labelled by the minimax oracle
//! 2. `train` fits a feed-forward network to those examples
//! 3. `evaluate` plays the network against a random opponent
//!
//! Each run writes `<data_dir>/<command>_stats.json`. Ctrl-C stops the
//! current run cleanly between examples, epochs or games.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn};

mod commands;
mod config;
mod evaluate;
mod policy;
mod stats;

use crate::config::Cli;
use crate::stats::RunStats;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    init_tracing(&cli.log_level)?;
    info!(log_level = %cli.log_level, command = cli.command.name(), "Tracing initialized");

    let cancel = Arc::new(AtomicBool::new(false));

    // Setup graceful shutdown
    let shutdown_flag = Arc::clone(&cancel);
    let shutdown_handle = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping after the current step...");
                shutdown_flag.store(true, Ordering::Relaxed);
            }
            Err(e) => warn!("Failed to listen for ctrl+c: {}", e),
        }
    });

    let started = Instant::now();
    let stats_dir = cli.stats_dir();
    let command = cli.command;
    let worker_flag = Arc::clone(&cancel);
    let run_result = tokio::task::spawn_blocking(move || commands::run(command, &worker_flag))
        .await
        .context("Worker thread panicked")?;

    shutdown_handle.abort();

    match run_result {
        Ok(details) => {
            let stats = RunStats::new(started, details);
            match stats.write(&stats_dir) {
                Ok(path) => info!(path = %path.display(), "Run stats written"),
                Err(e) => warn!("Failed to write run stats: {:#}", e),
            }
            if cancel.load(Ordering::Relaxed) {
                warn!("Run was cancelled before completion");
            }
            info!(
                runtime_secs = format!("{:.1}", stats.runtime_seconds),
                "t3 {} completed",
                stats.details.command()
            );
            Ok(())
        }
        Err(e) => {
            error!("t3 failed: {:#}", e);
            Err(e)
        }
    }
}
