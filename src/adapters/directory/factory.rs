//! Directory client factory
//!
//! This module provides the factory function that creates the Directory client
//! selected by configuration.

use crate::adapters::directory::graphql::DirectoryGraphqlClient;
use crate::adapters::directory::rest::DirectoryRestClient;
use crate::adapters::directory::traits::DirectoryApi;
use crate::config::{DirectoryApiKind, SyncConfig};
use crate::domain::Result;
use std::sync::Arc;

/// Create a Directory client based on `directory.api`
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created
pub fn create_directory_client(config: &SyncConfig) -> Result<Arc<dyn DirectoryApi>> {
    let directory = &config.directory;
    match directory.api {
        DirectoryApiKind::Rest => {
            tracing::info!(base_url = %directory.base_url, "Creating Directory REST client");
            Ok(Arc::new(DirectoryRestClient::new(directory)?) as Arc<dyn DirectoryApi>)
        }
        DirectoryApiKind::Graphql => {
            tracing::info!(
                base_url = %directory.base_url,
                fallback_schema = %directory.fallback_schema,
                "Creating Directory GraphQL client"
            );
            Ok(Arc::new(DirectoryGraphqlClient::new(directory)?) as Arc<dyn DirectoryApi>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const CONFIG: &str = r#"
[store]
path = "/tmp/rows.json"

[directory]
api = "graphql"
base_url = "https://directory.example.org/"
"#;

    #[test]
    fn test_factory_selects_client_by_api() {
        let config = parse_config(CONFIG).unwrap();
        let client = create_directory_client(&config).unwrap();
        assert_eq!(client.base_url(), "https://directory.example.org");
    }
}
