//! Configuration management for directory-sync.
//!
//! # Overview
//!
//! directory-sync uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `DIRSYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use directory_sync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("directory-sync.toml")?;
//!
//! println!("Directory: {}", config.directory.base_url);
//! println!("Min donors: {}", config.sync.min_donors);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level, dry run
//! - [`StoreConfig`] - clinical sample store
//! - [`DirectoryConfig`] - Directory API, credentials, paging
//! - [`SyncSection`] - privacy thresholds, retries, age brackets
//! - [`BiobankEntry`] - locally known biobank attributes
//! - [`LoggingConfig`] - file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [store]
//! path = "/data/directory-rows.json"
//!
//! [directory]
//! api = "rest"
//! base_url = "https://directory.bbmri-eric.eu"
//! token = "${DIRSYNC_TOKEN}"
//! country_code = "DE"
//!
//! [sync]
//! min_donors = 10
//! max_facts = 10000
//! retry_max = 3
//! retry_interval_seconds = 60
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BiobankEntry, DirectoryApiKind, DirectoryConfig, Environment,
    LoggingConfig, StoreConfig, SyncConfig, SyncSection,
};
pub use secret::{exposed_token, secret_string, SecretString, SecretValue};
