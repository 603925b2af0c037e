//! Typed snapshots of Directory collection and biobank entities
//!
//! Both types describe what the Directory holds (or should hold) for one
//! entity. Scalar fields are optional because either side may not know them;
//! list fields are plain vectors where empty means "nothing known".
//!
//! Fields of a fetched document that are not modelled here (owning biobank,
//! collection type, contact, ...) travel along in `unmodeled` and are written
//! back as they were read.

use crate::domain::ids::{BiobankId, CollectionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection metadata as published in the Directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAttributes {
    pub id: CollectionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Number of samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// floor(log10(size))
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_of_magnitude: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_donors: Option<u64>,

    /// floor(log10(number_of_donors))
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_of_magnitude_donors: Option<u32>,

    /// Lowest age at diagnosis, in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_low: Option<u32>,

    /// Highest age at diagnosis, in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_high: Option<u32>,

    #[serde(default)]
    pub sex: Vec<String>,

    #[serde(default)]
    pub materials: Vec<String>,

    #[serde(default)]
    pub storage_temperatures: Vec<String>,

    /// Corrected diagnosis codes in MIRIAM form
    #[serde(default)]
    pub diagnosis_available: Vec<String>,

    #[serde(default)]
    pub networks: Vec<String>,

    #[serde(default)]
    pub data_categories: Vec<String>,

    /// Remote fields outside this model, in write encoding
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub unmodeled: Map<String, Value>,
}

impl CollectionAttributes {
    /// Empty snapshot for a collection
    pub fn new(id: CollectionId) -> Self {
        Self {
            id,
            name: None,
            description: None,
            size: None,
            order_of_magnitude: None,
            number_of_donors: None,
            order_of_magnitude_donors: None,
            age_low: None,
            age_high: None,
            sex: Vec::new(),
            materials: Vec::new(),
            storage_temperatures: Vec::new(),
            diagnosis_available: Vec::new(),
            networks: Vec::new(),
            data_categories: Vec::new(),
            unmodeled: Map::new(),
        }
    }
}

/// Biobank metadata as published in the Directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiobankAttributes {
    pub id: BiobankId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juridical_person: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Directory ID of the contact person
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(default)]
    pub networks: Vec<String>,

    /// Remote fields outside this model, in write encoding
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub unmodeled: Map<String, Value>,
}

impl BiobankAttributes {
    /// Empty snapshot for a biobank
    pub fn new(id: BiobankId) -> Self {
        Self {
            id,
            name: None,
            acronym: None,
            description: None,
            url: None,
            juridical_person: None,
            country: None,
            contact: None,
            networks: Vec::new(),
            unmodeled: Map::new(),
        }
    }
}

/// floor(log10(n)); `None` for zero
///
/// # Examples
///
/// ```
/// use directory_sync::domain::attributes::order_of_magnitude;
///
/// assert_eq!(order_of_magnitude(0), None);
/// assert_eq!(order_of_magnitude(9), Some(0));
/// assert_eq!(order_of_magnitude(10), Some(1));
/// assert_eq!(order_of_magnitude(12_345), Some(4));
/// ```
pub fn order_of_magnitude(n: u64) -> Option<u32> {
    n.checked_ilog10()
}
