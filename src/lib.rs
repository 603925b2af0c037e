// directory-sync - BBMRI-ERIC Directory synchronization
// Copyright (c) 2025 Directory Sync Contributors
// Licensed under the MIT License

//! # directory-sync - BBMRI-ERIC Directory synchronization
//!
//! directory-sync publishes aggregate, privacy-safe statistics about a
//! biobank's sample collections to the federated BBMRI-ERIC Directory and keeps
//! the Directory's collection and biobank metadata up to date.
//!
//! ## Overview
//!
//! One synchronization run:
//! - **Corrects** the raw diagnosis codes of the sample store and negotiates
//!   publishable codes with the Directory's vocabulary
//! - **Aggregates** sample rows into star model facts, suppressing or
//!   generalizing buckets with fewer than `min_donors` donors
//! - **Replaces** each collection's facts in the Directory
//! - **Reconciles** collection and biobank attributes, writing only changes
//!
//! Every Directory request goes to the national node first and to the
//! global endpoint when the national node refuses it.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Diagnosis correction, aggregation and synchronization
//! - [`adapters`] - Directory REST/GraphQL clients and the sample store
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use directory_sync::adapters::directory::create_directory_client;
//! use directory_sync::adapters::store::JsonSampleStore;
//! use directory_sync::config::load_config;
//! use directory_sync::core::sync::{SyncOptions, SyncOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("directory-sync.toml")?;
//!
//!     let orchestrator = SyncOrchestrator::new(
//!         Arc::new(JsonSampleStore::new(&config.store)),
//!         create_directory_client(&config)?,
//!         SyncOptions::from_config(&config)?,
//!     );
//!
//!     let report = orchestrator.run_with_failover().await;
//!     println!("Succeeded: {}", report.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Star Model
//!
//! Facts are keyed by collection, sex, disease, age range and sample type.
//! A fact ID is a hash of that key, so an unchanged snapshot always produces
//! the same IDs:
//!
//! ```rust
//! use directory_sync::core::aggregation::{StarModel, StarModelPolicy};
//! use directory_sync::core::diagnosis::DiagnosisCorrectionMap;
//! use directory_sync::domain::{CollectionId, SampleRecord};
//!
//! let id = CollectionId::new("bbmri-eric:ID:DE_1:collection:tumor").unwrap();
//! let rows: Vec<SampleRecord> = (0..12)
//!     .map(|i| {
//!         SampleRecord::new(id.clone(), format!("p{i}"), "serum")
//!             .with_sex("female")
//!             .with_diagnosis("C18.0")
//!             .with_age(50)
//!     })
//!     .collect();
//!
//! let model = StarModel::new(StarModelPolicy::new(10, 10_000));
//! let corrections = DiagnosisCorrectionMap::new();
//! let first = model.aggregate_collection(&id, &rows, &corrections).unwrap();
//! let second = model.aggregate_collection(&id, &rows, &corrections).unwrap();
//! assert_eq!(first.facts, second.facts);
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`], whose error type is
//! [`domain::SyncError`]:
//!
//! ```rust,no_run
//! use directory_sync::domain::SyncError;
//!
//! fn example() -> Result<(), SyncError> {
//!     let config = directory_sync::config::load_config("directory-sync.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
