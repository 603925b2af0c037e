// directory-sync - BBMRI-ERIC Directory synchronization
// Copyright (c) 2025 Directory Sync Contributors
// Licensed under the MIT License

use clap::Parser;
use directory_sync::cli::{Cli, Commands};
use directory_sync::config::{load_config, LoggingConfig};
use directory_sync::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (log_level, logging_config) = logging_settings(&cli);
    let logging_guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "directory-sync - BBMRI-ERIC Directory synchronization"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_shutdown(shutdown_tx));

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    // process::exit skips destructors; flush the file log first
    drop(logging_guard);
    process::exit(exit_code);
}

/// Console-only logging, plus the configured file log for `sync`
///
/// A configuration that fails to load is reported by the command itself.
fn logging_settings(cli: &Cli) -> (String, LoggingConfig) {
    let console_only = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };

    let config = match cli.command {
        Commands::Sync(_) => load_config(&cli.config).ok(),
        _ => None,
    };

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let logging = config.map(|c| c.logging).unwrap_or(console_only);
    (log_level, logging)
}

async fn wait_for_shutdown(shutdown_tx: watch::Sender<bool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
    }

    println!("\n⚠️  Shutdown signal received, finishing current collection...");
    let _ = shutdown_tx.send(true);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Sync(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
        Commands::CheckDiagnosis(args) => args.execute(&cli.config).await,
    }
}
