//! Core business logic for directory-sync.
//!
//! This module contains the reconciliation and aggregation engine.
//!
//! # Modules
//!
//! - [`diagnosis`] - Diagnosis code normalization and correction
//! - [`aggregation`] - Star model aggregation and collection profiles
//! - [`sync`] - Fact replacement, entity reconciliation and run orchestration
//!
//! # Synchronization Workflow
//!
//! 1. **Correct diagnoses**: normalize raw codes and negotiate them with the Directory
//! 2. **Aggregate**: bucket rows into facts, enforce the donor floor and the fact cap
//! 3. **Synchronize facts**: replace each collection's facts in the Directory
//! 4. **Reconcile entities**: update collection and biobank attributes that changed
//! 5. **Report**: log the run outcome; retry the run when it failed
//!
//! # Example
//!
//! ```rust,no_run
//! use directory_sync::adapters::directory::create_directory_client;
//! use directory_sync::adapters::store::JsonSampleStore;
//! use directory_sync::config::load_config;
//! use directory_sync::core::sync::{SyncOptions, SyncOrchestrator};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("directory-sync.toml")?;
//!
//! let directory = create_directory_client(&config)?;
//! let store = Arc::new(JsonSampleStore::new(&config.store));
//! let options = SyncOptions::from_config(&config)?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let orchestrator = SyncOrchestrator::new(store, directory, options).with_shutdown(shutdown_rx);
//! let report = orchestrator.run_with_failover().await;
//!
//! println!("Attempts: {}", report.attempts.len());
//! println!("Success: {}", report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod diagnosis;
pub mod sync;
