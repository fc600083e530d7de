//! aspkg - command-line client for the aspkg package registry.
//!
//! Logs in through the GitHub device flow, keeps the session token in
//! `~/.aspkgrc`, and publishes `package.json` manifests to the registry.

mod app;
mod cli;
mod ui;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use aspkg_core::Config;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Outcome};
use cli::Cli;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            ui::failure(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = Config::load().context("Failed to load configuration")?;
    let app = App::new(config).await?;
    info!(command = ?cli.command, "aspkg starting");

    let outcome = app.run(cli.command).await;
    app.shutdown().await;
    Ok(outcome)
}
