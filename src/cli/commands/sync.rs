//! Sync command implementation
//!
//! This module implements the `sync` command: one failover-wrapped
//! synchronization run of the sample store against the Directory.

use crate::adapters::directory::create_directory_client;
use crate::adapters::store::{JsonSampleStore, SampleStore};
use crate::config::load_config;
use crate::core::sync::{
    EntityChange, FailureKind, Stage, SyncOptions, SyncOrchestrator, SyncOutcome,
};
use crate::domain::CollectionId;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Dry run mode - compute facts and changes without writing to the Directory
    #[arg(long)]
    pub dry_run: bool,

    /// Override collection ID(s) to synchronize (comma-separated)
    #[arg(long)]
    pub collection_id: Option<String>,

    /// Override the minimum number of donors per published fact
    #[arg(long, value_name = "N")]
    pub min_donors: Option<usize>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(collection_ids) = &self.collection_id {
            let ids: Vec<String> = collection_ids
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::info!(collection_ids = ?ids, "Overriding collection IDs from CLI");
            config.sync.collection_ids = ids;
        }

        if let Some(min_donors) = self.min_donors {
            tracing::info!(min_donors, "Overriding minimum donors from CLI");
            config.sync.min_donors = min_donors;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        // overrides bypassed the loader's validation
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let options = match SyncOptions::from_config(&config) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2);
            }
        };

        if options.dry_run {
            tracing::info!("Dry run mode enabled - nothing will be written");
            println!("🔍 DRY RUN MODE - Nothing will be written to the Directory");
            println!();
        }

        let directory = match create_directory_client(&config) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Directory client");
                eprintln!("Failed to initialize Directory client: {e}");
                return Ok(4);
            }
        };

        let store = Arc::new(JsonSampleStore::new(&config.store));
        if let Err(e) = store.test_connection().await {
            tracing::error!(error = %e, "Sample store unavailable");
            eprintln!("Failed to open sample store: {e}");
            return Ok(4);
        }

        println!("🚀 Starting synchronization...");
        println!("  Directory: {} ({:?})", directory.base_url(), config.directory.api);
        println!(
            "  Collections: {}",
            if options.collection_ids.is_empty() {
                "All".to_string()
            } else {
                format!("{}", options.collection_ids.len())
            }
        );
        println!("  Min donors: {}", options.min_donors);
        println!("  Max facts: {}", options.max_facts);
        println!();

        let orchestrator =
            SyncOrchestrator::new(store, directory, options).with_shutdown(shutdown_signal);
        let report = orchestrator.run_with_failover().await;

        let Some(outcome) = report.outcome() else {
            eprintln!("Synchronization did not start");
            return Ok(5);
        };

        print_summary(outcome, report.attempts.len());
        Ok(exit_code(outcome))
    }
}

fn print_summary(outcome: &SyncOutcome, attempts: usize) {
    let failed: Vec<&CollectionId> = outcome.failed_collections();

    println!();
    println!("📊 Synchronization Summary:");
    println!("  Run ID: {}", outcome.run_id);
    println!("  Attempts: {attempts}");
    println!("  Final stage: {}", outcome.stage);
    println!("  Collections: {}", outcome.collections.len());
    println!("  Failed collections: {}", failed.len());
    println!("  Facts inserted: {}", outcome.facts_inserted());
    println!(
        "  Entities updated: {}",
        outcome
            .entities
            .iter()
            .filter(|e| e.change != EntityChange::Unchanged)
            .count()
    );
    println!("  Diagnosis corrections: {}", outcome.diagnostics.corrections);
    println!(
        "  Unresolved diagnoses: {}",
        outcome.diagnostics.unresolved_codes.len()
    );
    if let Some(finished_at) = outcome.finished_at {
        let duration = finished_at - outcome.started_at;
        println!("  Duration: {:.2}s", duration.num_milliseconds() as f64 / 1000.0);
    }
    println!();

    if !outcome.failures.is_empty() {
        println!("⚠️  Failures:");
        for failure in &outcome.failures {
            println!("  - [{}] {:?}: {}", failure.stage, failure.kind, failure.message);
            if let Some(context) = &failure.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}

/// 0 success, 1 partial failure, 5 failed run, 130 interrupted
fn exit_code(outcome: &SyncOutcome) -> i32 {
    if outcome
        .failures
        .iter()
        .any(|f| f.kind == FailureKind::Cancelled)
    {
        println!("⚠️  Synchronization interrupted. Run the same command to start over.");
        tracing::info!("Synchronization interrupted by user signal");
        130
    } else if outcome.is_success() {
        println!("✅ Synchronization completed successfully!");
        0
    } else if outcome.stage == Stage::Done {
        println!("⚠️  Synchronization completed with failures");
        1
    } else {
        println!("❌ Synchronization failed");
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::StageFailure;
    use uuid::Uuid;

    fn outcome(stage: Stage) -> SyncOutcome {
        let mut outcome = SyncOutcome::new(Uuid::new_v4(), 1, false);
        outcome.stage = stage;
        outcome
    }

    #[test]
    fn test_sync_args_defaults() {
        let args = SyncArgs {
            dry_run: false,
            collection_id: None,
            min_donors: None,
        };

        assert!(!args.dry_run);
        assert!(args.collection_id.is_none());
        assert!(args.min_donors.is_none());
    }

    #[test]
    fn test_exit_code_success() {
        assert_eq!(exit_code(&outcome(Stage::Done)), 0);
    }

    #[test]
    fn test_exit_code_partial_failure() {
        let mut outcome = outcome(Stage::Done);
        outcome.add_failure(
            StageFailure::new(Stage::SynchronizingFacts, FailureKind::Directory, "refused")
                .with_context("bbmri-eric:ID:DE_1:collection:a"),
        );
        assert_eq!(exit_code(&outcome), 1);
    }

    #[test]
    fn test_exit_code_failed_run() {
        assert_eq!(exit_code(&outcome(Stage::Failed)), 5);
    }

    #[test]
    fn test_exit_code_interrupted() {
        let mut outcome = outcome(Stage::Failed);
        outcome.add_failure(StageFailure::new(
            Stage::Aggregating,
            FailureKind::Cancelled,
            "shutdown requested",
        ));
        assert_eq!(exit_code(&outcome), 130);
    }
}
