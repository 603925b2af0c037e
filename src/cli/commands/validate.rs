//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the directory-sync configuration file.

use crate::config::{load_config, DirectoryApiKind};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Sample Store: {}", config.store.path);
        println!("  Directory: {}", config.directory.base_url);
        match config.directory.api {
            DirectoryApiKind::Rest => println!("  Directory API: REST"),
            DirectoryApiKind::Graphql => {
                println!("  Directory API: GraphQL");
                println!(
                    "  Country Schema Prefix: {}",
                    config.directory.country_schema_prefix
                );
                println!("  Fallback Schema: {}", config.directory.fallback_schema);
            }
        }
        println!(
            "  National Node: {}",
            config.directory.country_code.as_deref().unwrap_or("derived per collection")
        );
        println!(
            "  Token: {}",
            if config.directory.token.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!(
            "  Collections: {}",
            if config.sync.collection_ids.is_empty() {
                "All".to_string()
            } else {
                format!("{:?}", config.sync.collection_ids)
            }
        );
        println!("  Min Donors: {}", config.sync.min_donors);
        println!("  Max Facts: {}", config.sync.max_facts);
        println!(
            "  Age Ranges: {}",
            config
                .sync
                .age_ranges
                .iter()
                .map(|b| b.label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "  Retries: {} every {}s",
            config.sync.retry_max, config.sync.retry_interval_seconds
        );
        println!("  Biobanks: {}", config.biobanks.len());
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_missing_file_is_configuration_error() {
        let args = ValidateArgs {};
        let code = args.execute("/nonexistent/directory-sync.toml").await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[store]
path = "rows.json"

[directory]
base_url = "https://directory.example.org"
"#
        )
        .unwrap();

        let args = ValidateArgs {};
        let code = args.execute(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }
}
