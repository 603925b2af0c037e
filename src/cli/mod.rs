//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for directory-sync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// directory-sync - BBMRI-ERIC Directory synchronization
#[derive(Parser, Debug)]
#[command(name = "directory-sync")]
#[command(version, about, long_about = None)]
#[command(author = "Directory Sync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "directory-sync.toml",
        env = "DIRECTORY_SYNC_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DIRECTORY_SYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish sample statistics and metadata to the Directory
    Sync(commands::sync::SyncArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Show how raw diagnosis codes are normalized
    CheckDiagnosis(commands::check_diagnosis::CheckDiagnosisArgs),
}
