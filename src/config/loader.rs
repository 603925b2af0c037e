//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DirectoryApiKind, SyncConfig};
use crate::config::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into SyncConfig
/// 4. Applies environment variable overrides (DIRSYNC_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use directory_sync::config::loader::load_config;
///
/// let config = load_config("directory-sync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text with the same steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<SyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SyncConfig = toml::from_str(&contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_pattern();
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        // Placeholders in comments are left alone
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SyncError::Configuration(format!("Invalid value '{value}' for environment variable {name}"))
    })
}

/// Applies environment variable overrides using DIRSYNC_* prefix
///
/// Environment variables follow the pattern: DIRSYNC_<SECTION>_<KEY>
/// For example: DIRSYNC_DIRECTORY_BASE_URL, DIRSYNC_SYNC_MIN_DONORS
fn apply_env_overrides(config: &mut SyncConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    // Application overrides
    if let Some(val) = var("DIRSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = var("DIRSYNC_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_override("DIRSYNC_APPLICATION_DRY_RUN", &val)?;
    }

    // Store overrides
    if let Some(val) = var("DIRSYNC_STORE_PATH") {
        config.store.path = val;
    }
    if let Some(val) = var("DIRSYNC_STORE_TIMEOUT_SECONDS") {
        config.store.timeout_seconds = parse_override("DIRSYNC_STORE_TIMEOUT_SECONDS", &val)?;
    }

    // Directory overrides
    if let Some(val) = var("DIRSYNC_DIRECTORY_API") {
        config.directory.api = match val.to_ascii_lowercase().as_str() {
            "rest" => DirectoryApiKind::Rest,
            "graphql" => DirectoryApiKind::Graphql,
            other => {
                return Err(SyncError::Configuration(format!(
                    "Invalid DIRSYNC_DIRECTORY_API '{other}'. Must be one of: rest, graphql"
                )))
            }
        };
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_BASE_URL") {
        config.directory.base_url = val;
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_TOKEN") {
        config.directory.token = Some(secret_string(val));
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_COUNTRY_CODE") {
        config.directory.country_code = Some(val);
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_TIMEOUT_SECONDS") {
        config.directory.timeout_seconds =
            parse_override("DIRSYNC_DIRECTORY_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_TLS_VERIFY") {
        config.directory.tls_verify = parse_override("DIRSYNC_DIRECTORY_TLS_VERIFY", &val)?;
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_PAGE_SIZE") {
        config.directory.page_size = parse_override("DIRSYNC_DIRECTORY_PAGE_SIZE", &val)?;
    }
    if let Some(val) = var("DIRSYNC_DIRECTORY_BATCH_SIZE") {
        config.directory.batch_size = parse_override("DIRSYNC_DIRECTORY_BATCH_SIZE", &val)?;
    }

    // Sync overrides
    if let Some(val) = var("DIRSYNC_SYNC_COLLECTION_IDS") {
        config.sync.collection_ids = val
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(val) = var("DIRSYNC_SYNC_MIN_DONORS") {
        config.sync.min_donors = parse_override("DIRSYNC_SYNC_MIN_DONORS", &val)?;
    }
    if let Some(val) = var("DIRSYNC_SYNC_MAX_FACTS") {
        config.sync.max_facts = parse_override("DIRSYNC_SYNC_MAX_FACTS", &val)?;
    }
    if let Some(val) = var("DIRSYNC_SYNC_RETRY_MAX") {
        config.sync.retry_max = parse_override("DIRSYNC_SYNC_RETRY_MAX", &val)?;
    }
    if let Some(val) = var("DIRSYNC_SYNC_RETRY_INTERVAL_SECONDS") {
        config.sync.retry_interval_seconds =
            parse_override("DIRSYNC_SYNC_RETRY_INTERVAL_SECONDS", &val)?;
    }
    if let Some(val) = var("DIRSYNC_SYNC_UPDATE_COLLECTIONS") {
        config.sync.update_collections = parse_override("DIRSYNC_SYNC_UPDATE_COLLECTIONS", &val)?;
    }
    if let Some(val) = var("DIRSYNC_SYNC_UPDATE_BIOBANKS") {
        config.sync.update_biobanks = parse_override("DIRSYNC_SYNC_UPDATE_BIOBANKS", &val)?;
    }

    // Logging overrides
    if let Some(val) = var("DIRSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("DIRSYNC_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("DIRSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = var("DIRSYNC_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
