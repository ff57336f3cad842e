//! Main Entrypoint for Clotilde
//!
//! This binary is responsible for:
//! 1. Parsing flags and loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the speech, Wikipedia and joke collaborators.
//! 4. Running one interactive session on stdin/stdout until `stop`, end of
//!    input or Ctrl+C.

use anyhow::Context;
use clap::Parser;
use clotilde_service::{app::build_session, cli::Cli, config::Config};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Resolves on Ctrl+C. If the handler cannot be installed the session simply
/// runs without one.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Saying goodbye...");
}

async fn run() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let config = Config::from_env()
        .and_then(|config| config.with_cli(&cli))
        .context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    // Logs go to stderr; stdout belongs to the conversation.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!("Configuration loaded. Starting Clotilde...");

    // --- 3. Build the Session ---
    let mut session = build_session(&config)?;

    // --- 4. Converse ---
    let stdin = BufReader::new(tokio::io::stdin());
    let outcome = session
        .run_until(stdin, tokio::io::stdout(), shutdown_signal())
        .await?;
    info!(?outcome, "Clotilde has shut down.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await?;
    // A pending blocking read on stdin would otherwise keep the runtime alive.
    std::process::exit(0);
}
