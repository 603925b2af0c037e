//! Result type alias for directory-sync

use super::errors::SyncError;

/// Result type alias for directory-sync operations
///
/// # Examples
///
/// ```
/// use directory_sync::domain::result::Result;
/// use directory_sync::domain::errors::SyncError;
///
/// fn failing_function() -> Result<()> {
///     Err(SyncError::Validation("Invalid input".to_string()))
/// }
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;
