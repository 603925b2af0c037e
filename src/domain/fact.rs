//! Star model facts
//!
//! A [`Fact`] is one published aggregate row: a point in the
//! (sex, age range, diagnosis, sample type) space of one collection with its
//! donor and sample counts.

use crate::domain::diagnosis::DiagnosisCode;
use crate::domain::dimensions::Sex;
use crate::domain::ids::{CollectionId, CountryCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Namespace of generated fact identifiers
pub const FACT_ID_PREFIX: &str = "bbmri-eric:factID:";

/// Identity of a fact before counts are attached
///
/// Ordering is total and derived from the fields, which makes every
/// collection of keys iterate in the same order on every run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    pub collection_id: CollectionId,
    pub sex: Sex,
    pub disease: Option<DiagnosisCode>,
    pub age_range: String,
    pub sample_type: String,
}

impl FactKey {
    /// Same key with a different diagnosis value
    pub fn with_disease(&self, disease: Option<DiagnosisCode>) -> Self {
        Self {
            disease,
            ..self.clone()
        }
    }

    /// Deterministic fact identifier derived from all key fields
    ///
    /// # Examples
    ///
    /// ```
    /// use directory_sync::domain::fact::FactKey;
    /// use directory_sync::domain::dimensions::Sex;
    /// use directory_sync::domain::ids::CollectionId;
    ///
    /// let key = FactKey {
    ///     collection_id: CollectionId::new("bbmri-eric:ID:DE_1:collection:a").unwrap(),
    ///     sex: Sex::Female,
    ///     disease: None,
    ///     age_range: "Adult".to_string(),
    ///     sample_type: "DNA".to_string(),
    /// };
    /// assert_eq!(key.fact_id(), key.clone().fact_id());
    /// assert!(key.fact_id().starts_with("bbmri-eric:factID:DE_1:collection:a:id:"));
    /// ```
    pub fn fact_id(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.collection_id.as_str(),
            self.sex.as_str(),
            self.disease.as_ref().map(DiagnosisCode::as_str).unwrap_or(""),
            self.age_range.as_str(),
            self.sample_type.as_str(),
        ] {
            hasher.update(part.as_bytes());
            // Field separator that cannot occur in any field value
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());
        format!(
            "{FACT_ID_PREFIX}{}:id:{}",
            self.collection_id.local_part(),
            &digest[..32]
        )
    }
}

/// One published star model fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Deterministic identifier, see [`FactKey::fact_id`]
    pub id: String,

    /// Collection the fact describes
    pub collection: CollectionId,

    /// Sex dimension
    pub sex: Sex,

    /// Diagnosis dimension; absent means "any diagnosis"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<DiagnosisCode>,

    /// Age range dimension
    pub age_range: String,

    /// Sample type dimension (Directory material type)
    pub sample_type: String,

    /// Distinct donors contributing to this fact
    pub number_of_donors: usize,

    /// Samples contributing to this fact
    pub number_of_samples: usize,

    /// National node publishing the fact
    pub national_node: String,
}

impl Fact {
    /// Build a fact from its key and counts
    pub fn from_key(
        key: &FactKey,
        number_of_donors: usize,
        number_of_samples: usize,
        national_node: &CountryCode,
    ) -> Self {
        Self {
            id: key.fact_id(),
            collection: key.collection_id.clone(),
            sex: key.sex,
            disease: key.disease.clone(),
            age_range: key.age_range.clone(),
            sample_type: key.sample_type.clone(),
            number_of_donors,
            number_of_samples,
            national_node: national_node.as_str().to_string(),
        }
    }

    /// The key this fact was built from
    pub fn key(&self) -> FactKey {
        FactKey {
            collection_id: self.collection.clone(),
            sex: self.sex,
            disease: self.disease.clone(),
            age_range: self.age_range.clone(),
            sample_type: self.sample_type.clone(),
        }
    }
}
