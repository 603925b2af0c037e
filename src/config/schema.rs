//! Configuration schema types
//!
//! This module defines the configuration structure for directory-sync.

use crate::config::SecretString;
use crate::domain::dimensions::{default_age_brackets, validate_age_brackets, AgeBracket};
use crate::domain::{BiobankAttributes, BiobankId, CollectionId, CountryCode};
use serde::{Deserialize, Serialize};

/// Directory API flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryApiKind {
    /// Molgenis REST v2 API
    #[default]
    Rest,
    /// EMX2 GraphQL API
    Graphql,
}

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main directory-sync configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Clinical sample store
    pub store: StoreConfig,

    /// Directory connection
    pub directory: DirectoryConfig,

    /// Synchronization policy
    #[serde(default)]
    pub sync: SyncSection,

    /// Locally known biobank attributes
    #[serde(default)]
    pub biobanks: Vec<BiobankEntry>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate()?;
        self.directory.validate(&self.environment)?;
        self.sync.validate()?;
        for biobank in &self.biobanks {
            biobank.to_attributes()?;
        }
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (compute everything, write nothing)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Clinical sample store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON document holding pre-shaped sample rows
    pub path: String,

    /// Timeout in seconds for reading the store
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("store.path cannot be empty".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("store.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

/// Directory connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// API flavour (rest or graphql)
    #[serde(default)]
    pub api: DirectoryApiKind,

    /// Base URL of the Directory
    pub base_url: String,

    /// Pre-issued API token (optional)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub token: Option<SecretString>,

    /// National node; derived from collection IDs when absent
    #[serde(default)]
    pub country_code: Option<String>,

    /// Timeout in seconds for every Directory request
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: disabling verification is refused in production.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Fact IDs requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Facts per delete/insert request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// GraphQL schema used when the country schema refuses a request
    #[serde(default = "default_fallback_schema")]
    pub fallback_schema: String,

    /// Prefix of GraphQL country schemas (schema = prefix + country code)
    #[serde(default = "default_country_schema_prefix")]
    pub country_schema_prefix: String,
}

impl DirectoryConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("directory.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("directory.base_url must start with http:// or https://".to_string());
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(format!("directory.base_url '{}' is not a valid URL", self.base_url));
        }

        if let Some(code) = &self.country_code {
            CountryCode::new(code.as_str()).map_err(|e| format!("directory.country_code: {e}"))?;
        }

        if self.timeout_seconds == 0 {
            return Err("directory.timeout_seconds must be > 0".to_string());
        }

        if !(1..=10_000).contains(&self.page_size) {
            return Err("directory.page_size must be between 1 and 10000".to_string());
        }

        if !(1..=1_000).contains(&self.batch_size) {
            return Err("directory.batch_size must be between 1 and 1000".to_string());
        }

        if self.api == DirectoryApiKind::Graphql && self.fallback_schema.trim().is_empty() {
            return Err(
                "directory.fallback_schema cannot be empty when api = 'graphql'".to_string(),
            );
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production (directory.tls_verify)"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Configured national node, if any
    pub fn country(&self) -> Option<CountryCode> {
        self.country_code
            .as_deref()
            .and_then(|code| CountryCode::new(code).ok())
    }
}

/// Synchronization policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    /// Collections to synchronize; empty means every collection in the store
    #[serde(default)]
    pub collection_ids: Vec<String>,

    /// Minimum distinct donors per published fact
    #[serde(default = "default_min_donors")]
    pub min_donors: usize,

    /// Maximum facts per collection
    #[serde(default = "default_max_facts")]
    pub max_facts: usize,

    /// Attempts of the whole run
    #[serde(default = "default_retry_max")]
    pub retry_max: usize,

    /// Seconds between run attempts
    #[serde(default = "default_retry_interval_seconds")]
    pub retry_interval_seconds: u64,

    /// Reconcile collection attributes
    #[serde(default = "default_true")]
    pub update_collections: bool,

    /// Reconcile biobank attributes
    #[serde(default = "default_true")]
    pub update_biobanks: bool,

    /// Ordered age bracket table
    #[serde(default = "default_age_brackets")]
    pub age_ranges: Vec<AgeBracket>,
}

impl SyncSection {
    fn validate(&self) -> Result<(), String> {
        for id in &self.collection_ids {
            CollectionId::new(id.as_str()).map_err(|e| format!("sync.collection_ids: {e}"))?;
        }

        if self.min_donors == 0 {
            return Err("sync.min_donors must be > 0".to_string());
        }

        if self.max_facts == 0 {
            return Err("sync.max_facts must be > 0".to_string());
        }

        if !(1..=10).contains(&self.retry_max) {
            return Err("sync.retry_max must be between 1 and 10".to_string());
        }

        validate_age_brackets(&self.age_ranges).map_err(|e| format!("sync.age_ranges: {e}"))?;

        Ok(())
    }

    /// Configured collection IDs; invalid entries were rejected by validation
    pub fn collections(&self) -> Vec<CollectionId> {
        self.collection_ids
            .iter()
            .filter_map(|id| CollectionId::new(id.as_str()).ok())
            .collect()
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            collection_ids: Vec::new(),
            min_donors: default_min_donors(),
            max_facts: default_max_facts(),
            retry_max: default_retry_max(),
            retry_interval_seconds: default_retry_interval_seconds(),
            update_collections: true,
            update_biobanks: true,
            age_ranges: default_age_brackets(),
        }
    }
}

/// One `[[biobanks]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiobankEntry {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub acronym: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub juridical_person: Option<String>,

    /// Directory ID of the contact person
    #[serde(default)]
    pub contact: Option<String>,

    #[serde(default)]
    pub networks: Vec<String>,
}

impl BiobankEntry {
    /// Local attributes for the reconciler
    pub fn to_attributes(&self) -> Result<BiobankAttributes, String> {
        let id = BiobankId::new(self.id.as_str()).map_err(|e| format!("biobanks.id: {e}"))?;
        if let Some(url) = &self.url {
            url::Url::parse(url).map_err(|e| format!("biobanks.url '{url}': {e}"))?;
        }
        if let Some(contact) = &self.contact {
            if contact.trim().is_empty() {
                return Err(format!("biobanks.contact of '{}' cannot be empty", self.id));
            }
        }

        let mut attrs = BiobankAttributes::new(id);
        attrs.country = attrs.id.country_code().map(|c| c.as_str().to_string());
        attrs.name = self.name.clone();
        attrs.acronym = self.acronym.clone();
        attrs.description = self.description.clone();
        attrs.url = self.url.clone();
        attrs.juridical_person = self.juridical_person.clone();
        attrs.contact = self.contact.clone();
        attrs.networks = self.networks.clone();
        Ok(attrs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    1000
}

fn default_fallback_schema() -> String {
    "ERIC".to_string()
}

fn default_country_schema_prefix() -> String {
    "BBMRI-".to_string()
}

fn default_min_donors() -> usize {
    10
}

fn default_max_facts() -> usize {
    10_000
}

fn default_retry_max() -> usize {
    3
}

fn default_retry_interval_seconds() -> u64 {
    60
}

fn default_local_path() -> String {
    "/var/log/directory-sync".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
