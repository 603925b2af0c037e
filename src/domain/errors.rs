//! Domain error types
//!
//! This module defines the error hierarchy for directory-sync.
//! Collaborator errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main directory-sync error type
///
/// This is the primary error type used throughout the application.
/// It wraps collaborator-specific errors and provides context for error handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Clinical sample store errors
    #[error("Sample store error: {0}")]
    Store(#[from] StoreError),

    /// Directory (registry) errors
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Privacy or volume policy violations (min donors, max facts)
    #[error("Policy violation: {0}")]
    Policy(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Clinical sample store errors
///
/// Errors raised while reading pre-shaped sample rows or diagnosis codes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened or reached
    #[error("Sample store unavailable: {0}")]
    Unavailable(String),

    /// The store returned data that does not match the expected shape
    #[error("Invalid sample data: {0}")]
    InvalidData(String),

    /// The requested collection is unknown to the store
    #[error("Collection not found in sample store: {0}")]
    CollectionNotFound(String),

    /// Timeout
    #[error("Sample store timeout: {0}")]
    Timeout(String),
}

/// Directory-specific errors
///
/// Errors that occur when talking to the Directory REST or GraphQL API.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Failed to connect to the Directory
    #[error("Failed to connect to Directory: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("Directory request timeout: {0}")]
    Timeout(String),

    /// The Directory refused the request
    #[error("Directory rejected request: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be understood
    #[error("Invalid response from Directory: {0}")]
    InvalidResponse(String),

    /// Entity not found
    #[error("Entity not found in Directory: {0}")]
    NotFound(String),

    /// Both the country-scoped and the country-agnostic endpoint failed
    #[error("{operation} failed on both endpoints: country: {country}; global: {global}")]
    BothEndpointsFailed {
        operation: String,
        country: String,
        global: String,
    },
}

impl DirectoryError {
    /// Whether the error was caused by the transport rather than the Directory itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed(_) | DirectoryError::Timeout(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_directory_error_conversion() {
        let dir_err = DirectoryError::ConnectionFailed("Network error".to_string());
        let sync_err: SyncError = dir_err.into();
        assert!(matches!(sync_err, SyncError::Directory(_)));
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::Unavailable("no such file".to_string());
        let sync_err: SyncError = store_err.into();
        assert!(matches!(sync_err, SyncError::Store(_)));
    }

    #[test]
    fn test_both_endpoints_failed_message() {
        let err = DirectoryError::BothEndpointsFailed {
            operation: "insert_facts".to_string(),
            country: "rejected".to_string(),
            global: "timeout".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("insert_facts"));
        assert!(msg.contains("rejected"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_is_transport() {
        assert!(DirectoryError::Timeout("30s".to_string()).is_transport());
        assert!(!DirectoryError::Rejected {
            status: 400,
            message: "bad".to_string()
        }
        .is_transport());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let sync_err: SyncError = io_err.into();
        assert!(matches!(sync_err, SyncError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let sync_err: SyncError = json_err.into();
        assert!(matches!(sync_err, SyncError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let sync_err: SyncError = toml_err.into();
        assert!(matches!(sync_err, SyncError::Configuration(_)));
        assert!(sync_err.to_string().contains("TOML parse error"));
    }
}
