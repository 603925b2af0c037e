//! Directory API trait definition
//!
//! This module defines the `DirectoryApi` trait that abstracts the two
//! Directory flavours (Molgenis REST and EMX2 GraphQL) behind one capability
//! set. Every method is addressed to an [`Endpoint`]: the national node's
//! country-scoped tables/schema, or the country-agnostic global one.

use crate::domain::{
    BiobankAttributes, BiobankId, CollectionAttributes, CollectionId, CountryCode, DirectoryError,
    Fact,
};
use async_trait::async_trait;
use std::fmt;

/// Result type of Directory calls
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Which side of the Directory a request is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Tables or schema of one national node
    Country(CountryCode),
    /// Country-agnostic tables or schema
    Global,
}

impl Endpoint {
    /// Country code of a country endpoint
    pub fn country(&self) -> Option<&CountryCode> {
        match self {
            Endpoint::Country(code) => Some(code),
            Endpoint::Global => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Country(code) => write!(f, "country:{code}"),
            Endpoint::Global => write!(f, "global"),
        }
    }
}

/// Capability set of a Directory client
///
/// Implementations report a refusal by the Directory (4xx, missing table,
/// mutation error) as `Ok(false)` / `Ok(None)`, and transport problems or
/// server errors as `Err`. Callers treat both as "try the other endpoint",
/// see [`crate::adapters::directory::with_fallback`].
///
/// # Example
///
/// ```no_run
/// use directory_sync::adapters::directory::{create_directory_client, Endpoint};
/// use directory_sync::config::load_config;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config("directory-sync.toml")?;
/// let directory = create_directory_client(&config)?;
///
/// let known = directory
///     .validate_diagnosis(&Endpoint::Global, "urn:miriam:icd:C18.0")
///     .await?;
/// println!("C18.0 known to the Directory: {known}");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Whether `code` (MIRIAM form) exists in the diagnosis vocabulary
    async fn validate_diagnosis(&self, endpoint: &Endpoint, code: &str) -> DirectoryResult<bool>;

    /// One page of fact IDs of a collection; an empty page ends the listing
    ///
    /// Pages are numbered from zero. The page size is a client setting.
    async fn list_fact_ids(
        &self,
        endpoint: &Endpoint,
        collection_id: &CollectionId,
        page: usize,
    ) -> DirectoryResult<Vec<String>>;

    /// Delete facts by ID
    async fn delete_facts(&self, endpoint: &Endpoint, ids: &[String]) -> DirectoryResult<bool>;

    /// Insert facts
    async fn insert_facts(&self, endpoint: &Endpoint, facts: &[Fact]) -> DirectoryResult<bool>;

    /// Current collection attributes; `None` when the Directory has no such collection
    async fn get_collection(
        &self,
        endpoint: &Endpoint,
        id: &CollectionId,
    ) -> DirectoryResult<Option<CollectionAttributes>>;

    /// Overwrite collection attributes
    async fn put_collection(
        &self,
        endpoint: &Endpoint,
        attributes: &CollectionAttributes,
    ) -> DirectoryResult<bool>;

    /// Current biobank attributes; `None` when the Directory has no such biobank
    async fn get_biobank(
        &self,
        endpoint: &Endpoint,
        id: &BiobankId,
    ) -> DirectoryResult<Option<BiobankAttributes>>;

    /// Overwrite biobank attributes
    async fn put_biobank(
        &self,
        endpoint: &Endpoint,
        attributes: &BiobankAttributes,
    ) -> DirectoryResult<bool>;

    /// Base URL, for logging
    fn base_url(&self) -> &str;
}
