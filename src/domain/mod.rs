//! Domain models and types for directory-sync.
//!
//! This module contains the value types shared by every stage of a
//! synchronization run.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`CollectionId`], [`BiobankId`], [`CountryCode`])
//! - **Input rows** ([`SampleRecord`]) and canonical diagnoses ([`DiagnosisCode`])
//! - **Star model values** ([`Fact`], [`FactKey`], [`Sex`], [`AgeBracket`])
//! - **Entity snapshots** ([`CollectionAttributes`], [`BiobankAttributes`])
//! - **Error types** ([`SyncError`], [`StoreError`], [`DirectoryError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so that collection and biobank IDs
//! cannot be mixed up:
//!
//! ```rust
//! use directory_sync::domain::{BiobankId, CollectionId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let collection = CollectionId::new("bbmri-eric:ID:DE_1:collection:tumor")?;
//! let biobank: Option<BiobankId> = collection.biobank_id();
//! assert_eq!(biobank.unwrap().as_str(), "bbmri-eric:ID:DE_1");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`]:
//!
//! ```rust
//! use directory_sync::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = directory_sync::config::load_config("directory-sync.toml")?;
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod diagnosis;
pub mod dimensions;
pub mod errors;
pub mod fact;
pub mod ids;
pub mod result;
pub mod sample;

// Re-export commonly used types for convenience
pub use attributes::{BiobankAttributes, CollectionAttributes};
pub use diagnosis::DiagnosisCode;
pub use dimensions::{AgeBracket, Sex};
pub use errors::{DirectoryError, StoreError, SyncError};
pub use fact::{Fact, FactKey};
pub use ids::{BiobankId, CollectionId, CountryCode};
pub use result::Result;
pub use sample::SampleRecord;
