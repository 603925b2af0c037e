//! Sample rows as delivered by the clinical sample store
//!
//! One [`SampleRecord`] exists per patient/specimen/diagnosis combination.
//! Rows are produced outside this crate and are never mutated here.

use crate::domain::ids::CollectionId;
use serde::{Deserialize, Serialize};

/// One patient/specimen/diagnosis row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Directory collection the specimen belongs to
    #[serde(alias = "collectionId")]
    pub collection_id: CollectionId,

    /// Clinical material code (e.g. `tissue-ffpe`, `whole-blood`)
    #[serde(alias = "sampleMaterial")]
    pub sample_material: String,

    /// Pseudonymous patient identifier, used only for distinct donor counting
    #[serde(alias = "patientId")]
    pub patient_id: String,

    /// Administrative gender as recorded in the store
    #[serde(default)]
    pub sex: Option<String>,

    /// Diagnosis code as recorded in the store, possibly malformed
    #[serde(default, alias = "rawDiagnosisCode")]
    pub raw_diagnosis_code: Option<String>,

    /// Age of the patient at diagnosis, in years
    #[serde(default, alias = "ageAtDiagnosis")]
    pub age_at_diagnosis: Option<u32>,
}

impl SampleRecord {
    /// Create a row with the mandatory fields; optional fields start empty
    pub fn new(
        collection_id: CollectionId,
        patient_id: impl Into<String>,
        sample_material: impl Into<String>,
    ) -> Self {
        Self {
            collection_id,
            sample_material: sample_material.into(),
            patient_id: patient_id.into(),
            sex: None,
            raw_diagnosis_code: None,
            age_at_diagnosis: None,
        }
    }

    /// Set the recorded sex
    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    /// Set the raw diagnosis code
    pub fn with_diagnosis(mut self, code: impl Into<String>) -> Self {
        self.raw_diagnosis_code = Some(code.into());
        self
    }

    /// Set the age at diagnosis
    pub fn with_age(mut self, age: u32) -> Self {
        self.age_at_diagnosis = Some(age);
        self
    }

    /// The raw diagnosis code, if present and not blank
    pub fn diagnosis(&self) -> Option<&str> {
        self.raw_diagnosis_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
