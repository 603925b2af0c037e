//! Clinical sample store abstraction
//!
//! The store hands out already-shaped [`SampleRecord`] rows. How they are
//! extracted from clinical records is not this crate's concern.

use crate::domain::{CollectionId, Result, SampleRecord};
use async_trait::async_trait;

/// Which rows contribute raw diagnosis codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosisScope {
    /// Every row in the store
    All,
    /// Rows of the listed collections only
    Collections(Vec<CollectionId>),
}

impl DiagnosisScope {
    /// Whether rows of `collection_id` fall in the scope
    pub fn includes(&self, collection_id: &CollectionId) -> bool {
        match self {
            DiagnosisScope::All => true,
            DiagnosisScope::Collections(ids) => ids.contains(collection_id),
        }
    }
}

/// Read-only access to sample rows
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Test that the store can be read
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or malformed.
    async fn test_connection(&self) -> Result<()>;

    /// Collections that have at least one row, in ID order
    async fn list_collection_ids(&self) -> Result<Vec<CollectionId>>;

    /// All rows of one collection; empty when the collection has none
    async fn fetch_sample_records(&self, collection_id: &CollectionId) -> Result<Vec<SampleRecord>>;

    /// Non-blank raw diagnosis codes of the rows in scope, duplicates included
    ///
    /// # Errors
    ///
    /// A store failure is returned as-is; callers must not treat it as "no codes".
    async fn fetch_raw_diagnoses(&self, scope: &DiagnosisScope) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_includes() {
        let a = CollectionId::new("bbmri-eric:ID:DE_1:collection:a").unwrap();
        let b = CollectionId::new("bbmri-eric:ID:DE_1:collection:b").unwrap();
        assert!(DiagnosisScope::All.includes(&a));
        let scope = DiagnosisScope::Collections(vec![a.clone()]);
        assert!(scope.includes(&a));
        assert!(!scope.includes(&b));
    }
}
