//! External system integrations for directory-sync.
//!
//! This module provides adapters for the two collaborators of a run:
//!
//! - [`directory`] - the BBMRI-ERIC Directory (Molgenis REST or EMX2 GraphQL)
//! - [`store`] - the clinical sample store
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. Both collaborators are
//! reached through `async_trait` traits held as `Arc<dyn ...>`.
//!
//! ```rust,no_run
//! use directory_sync::adapters::directory::create_directory_client;
//! use directory_sync::adapters::store::{JsonSampleStore, SampleStore};
//! use directory_sync::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("directory-sync.toml")?;
//!
//! let directory = create_directory_client(&config)?;
//! let store = JsonSampleStore::new(&config.store);
//! store.test_connection().await?;
//!
//! println!("Syncing to {}", directory.base_url());
//! # Ok(())
//! # }
//! ```

pub mod directory;
pub mod store;
