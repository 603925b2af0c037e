//! Domain identifier types with validation
//!
//! Newtype wrappers for Directory identifiers. Directory identifiers follow
//! the pattern `bbmri-eric:ID:<CC>_<local>` for biobanks and
//! `bbmri-eric:ID:<CC>_<local>:collection:<local>` for collections, where
//! `<CC>` is the country code of the national node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by all Directory entity identifiers
pub const DIRECTORY_ID_PREFIX: &str = "bbmri-eric:ID:";

const COLLECTION_SEPARATOR: &str = ":collection:";

/// Collection identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use directory_sync::domain::ids::CollectionId;
/// use std::str::FromStr;
///
/// let id = CollectionId::from_str("bbmri-eric:ID:DE_1234:collection:tumor").unwrap();
/// assert_eq!(id.country_code().unwrap().as_str(), "DE");
/// assert_eq!(id.biobank_id().unwrap().as_str(), "bbmri-eric:ID:DE_1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(String);

impl CollectionId {
    /// Creates a new CollectionId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Collection ID cannot be empty".to_string());
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(format!("Collection ID must not contain whitespace: '{id}'"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the collection ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier without the `bbmri-eric:ID:` prefix
    pub fn local_part(&self) -> &str {
        self.0.strip_prefix(DIRECTORY_ID_PREFIX).unwrap_or(&self.0)
    }

    /// Biobank owning this collection, if the ID follows the Directory pattern
    pub fn biobank_id(&self) -> Option<BiobankId> {
        let (biobank, _) = self.0.split_once(COLLECTION_SEPARATOR)?;
        BiobankId::new(biobank).ok()
    }

    /// Country code of the national node, taken from the ID
    pub fn country_code(&self) -> Option<CountryCode> {
        country_from_local_part(self.local_part())
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Biobank identifier newtype wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiobankId(String);

impl BiobankId {
    /// Creates a new BiobankId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Biobank ID cannot be empty".to_string());
        }
        if trimmed.contains(COLLECTION_SEPARATOR) {
            return Err(format!("'{id}' is a collection ID, not a biobank ID"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the biobank ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Country code of the national node, taken from the ID
    pub fn country_code(&self) -> Option<CountryCode> {
        let local = self.0.strip_prefix(DIRECTORY_ID_PREFIX).unwrap_or(&self.0);
        country_from_local_part(local)
    }
}

impl fmt::Display for BiobankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BiobankId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// National node country code (e.g. `DE`, `AT`, `EXT`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Creates a new CountryCode, normalising to upper case
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into().trim().to_ascii_uppercase();
        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!(
                "Invalid country code '{code}'. Expected 2 or 3 letters"
            ));
        }
        Ok(Self(code))
    }

    /// Returns the country code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CountryCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn country_from_local_part(local: &str) -> Option<CountryCode> {
    let (country, _) = local.split_once('_')?;
    CountryCode::new(country).ok()
}
