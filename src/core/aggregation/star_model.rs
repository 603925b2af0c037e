//! Star model aggregation with privacy-floor generalization
//!
//! Rows are bucketed by (collection, sex, age range, sample type, diagnosis).
//! Buckets whose distinct-donor count is below `min_donors` are generalized
//! one diagnosis level at a time: subcategory, then ICD-10 category, then no
//! diagnosis. At each level every under-threshold bucket is pooled with the
//! other buckets sharing the coarser key. Buckets still under the floor
//! without a diagnosis are suppressed.
//!
//! Diagnosis corrections are applied to the surviving facts afterwards;
//! facts whose keys coincide after correction are merged.

use crate::core::diagnosis::{normalize, DiagnosisCorrectionMap};
use crate::domain::dimensions::{
    age_range_label, default_age_brackets, material_type, AgeBracket, Sex,
};
use crate::domain::fact::{Fact, FactKey};
use crate::domain::ids::{CollectionId, CountryCode};
use crate::domain::{DiagnosisCode, Result, SampleRecord, SyncError};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregation thresholds and dimension tables
#[derive(Debug, Clone)]
pub struct StarModelPolicy {
    /// Minimum distinct donors for a fact to be published
    pub min_donors: usize,

    /// Maximum facts per collection; above this the collection is rejected
    pub max_facts: usize,

    /// Ordered age bracket table
    pub age_brackets: Vec<AgeBracket>,

    /// National node for every fact; derived from the collection ID when absent
    pub national_node: Option<CountryCode>,
}

impl StarModelPolicy {
    pub fn new(min_donors: usize, max_facts: usize) -> Self {
        Self {
            min_donors,
            max_facts,
            age_brackets: default_age_brackets(),
            national_node: None,
        }
    }

    pub fn with_age_brackets(mut self, age_brackets: Vec<AgeBracket>) -> Self {
        self.age_brackets = age_brackets;
        self
    }

    pub fn with_national_node(mut self, node: Option<CountryCode>) -> Self {
        self.national_node = node;
        self
    }
}

/// A bucket that could not reach the donor floor even without a diagnosis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressedBucket {
    pub key: FactKey,
    pub donors: usize,
    pub samples: usize,
}

/// The collection produced more facts than allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapViolation {
    pub fact_count: usize,
    pub max_facts: usize,
}

/// Aggregation output for one collection
#[derive(Debug, Clone)]
pub struct CollectionAggregate {
    pub collection_id: CollectionId,
    pub national_node: CountryCode,

    /// Facts in key order
    pub facts: Vec<Fact>,

    /// Buckets dropped by the donor floor
    pub suppressed: Vec<SuppressedBucket>,

    /// Diagnoses removed from facts because no correction was available
    pub dropped_diagnoses: BTreeSet<DiagnosisCode>,

    /// Set when the facts must not be published
    pub cap_violation: Option<CapViolation>,
}

impl CollectionAggregate {
    /// Whether the facts may replace the Directory's current facts
    pub fn is_publishable(&self) -> bool {
        self.cap_violation.is_none()
    }
}

#[derive(Debug, Default)]
struct Bucket {
    donors: BTreeSet<String>,
    samples: usize,
}

impl Bucket {
    fn absorb(&mut self, other: Bucket) {
        self.donors.extend(other.donors);
        self.samples += other.samples;
    }

    fn donor_count(&self) -> usize {
        self.donors.len()
    }
}

type Level = BTreeMap<FactKey, Bucket>;

/// Star model aggregator
#[derive(Debug, Clone)]
pub struct StarModel {
    policy: StarModelPolicy,
}

impl StarModel {
    pub fn new(policy: StarModelPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &StarModelPolicy {
        &self.policy
    }

    /// Aggregate rows of any number of collections
    ///
    /// Collections are returned in ID order.
    pub fn aggregate(
        &self,
        rows: &[SampleRecord],
        corrections: &DiagnosisCorrectionMap,
    ) -> Result<Vec<CollectionAggregate>> {
        let mut by_collection: BTreeMap<&CollectionId, Vec<&SampleRecord>> = BTreeMap::new();
        for row in rows {
            by_collection.entry(&row.collection_id).or_default().push(row);
        }

        by_collection
            .into_iter()
            .map(|(collection_id, rows)| self.aggregate_rows(collection_id, rows, corrections))
            .collect()
    }

    /// Aggregate the rows of one collection
    ///
    /// Rows belonging to other collections are ignored.
    pub fn aggregate_collection(
        &self,
        collection_id: &CollectionId,
        rows: &[SampleRecord],
        corrections: &DiagnosisCorrectionMap,
    ) -> Result<CollectionAggregate> {
        let own: Vec<&SampleRecord> = rows
            .iter()
            .filter(|row| &row.collection_id == collection_id)
            .collect();
        if own.len() != rows.len() {
            tracing::warn!(
                collection_id = %collection_id,
                ignored = rows.len() - own.len(),
                "Ignoring rows of other collections"
            );
        }
        self.aggregate_rows(collection_id, own, corrections)
    }

    fn aggregate_rows(
        &self,
        collection_id: &CollectionId,
        rows: Vec<&SampleRecord>,
        corrections: &DiagnosisCorrectionMap,
    ) -> Result<CollectionAggregate> {
        let national_node = self
            .policy
            .national_node
            .clone()
            .or_else(|| collection_id.country_code())
            .ok_or_else(|| {
                SyncError::Validation(format!(
                    "Cannot determine national node for collection {collection_id}"
                ))
            })?;

        let (subcategory, mut category, mut undiagnosed) = self.bucket(collection_id, rows);
        let min = self.policy.min_donors;
        let mut published = Level::new();

        for (key, bucket) in subcategory {
            if bucket.donor_count() >= min {
                published.insert(key, bucket);
            } else {
                let coarser = key.with_disease(key.disease.as_ref().map(DiagnosisCode::category));
                category.entry(coarser).or_default().absorb(bucket);
            }
        }

        for (key, bucket) in category {
            if bucket.donor_count() >= min {
                published.insert(key, bucket);
            } else {
                undiagnosed.entry(key.with_disease(None)).or_default().absorb(bucket);
            }
        }

        let mut suppressed = Vec::new();
        for (key, bucket) in undiagnosed {
            if bucket.donor_count() >= min {
                published.insert(key, bucket);
            } else {
                tracing::debug!(
                    collection_id = %collection_id,
                    sex = %key.sex,
                    age_range = %key.age_range,
                    sample_type = %key.sample_type,
                    donors = bucket.donor_count(),
                    "Bucket suppressed below donor floor"
                );
                suppressed.push(SuppressedBucket {
                    key,
                    donors: bucket.donors.len(),
                    samples: bucket.samples,
                });
            }
        }

        let (corrected, dropped_diagnoses) = apply_corrections(published, corrections);

        let facts: Vec<Fact> = corrected
            .iter()
            .map(|(key, bucket)| {
                Fact::from_key(key, bucket.donor_count(), bucket.samples, &national_node)
            })
            .collect();

        let cap_violation = (facts.len() > self.policy.max_facts).then(|| CapViolation {
            fact_count: facts.len(),
            max_facts: self.policy.max_facts,
        });
        if let Some(violation) = &cap_violation {
            tracing::warn!(
                collection_id = %collection_id,
                fact_count = violation.fact_count,
                max_facts = violation.max_facts,
                "Fact count exceeds maximum; collection will not be published"
            );
        }

        tracing::debug!(
            collection_id = %collection_id,
            facts = facts.len(),
            suppressed = suppressed.len(),
            dropped_diagnoses = dropped_diagnoses.len(),
            "Collection aggregated"
        );

        Ok(CollectionAggregate {
            collection_id: collection_id.clone(),
            national_node,
            facts,
            suppressed,
            dropped_diagnoses,
            cap_violation,
        })
    }

    /// Initial buckets split by the granularity of their diagnosis
    fn bucket(&self, collection_id: &CollectionId, rows: Vec<&SampleRecord>) -> (Level, Level, Level) {
        let mut subcategory = Level::new();
        let mut category = Level::new();
        let mut undiagnosed = Level::new();

        for row in rows {
            let disease = row.diagnosis().map(normalize);
            let level = match &disease {
                Some(code) if code.has_subcategory() => &mut subcategory,
                Some(_) => &mut category,
                None => &mut undiagnosed,
            };
            let key = FactKey {
                collection_id: collection_id.clone(),
                sex: Sex::from_record(row.sex.as_deref()),
                disease,
                age_range: age_range_label(row.age_at_diagnosis, &self.policy.age_brackets),
                sample_type: material_type(&row.sample_material).to_string(),
            };
            let bucket = level.entry(key).or_default();
            bucket.donors.insert(row.patient_id.clone());
            bucket.samples += 1;
        }

        (subcategory, category, undiagnosed)
    }
}

/// Replace diagnoses by their corrections, merging keys that coincide
fn apply_corrections(
    published: Level,
    corrections: &DiagnosisCorrectionMap,
) -> (Level, BTreeSet<DiagnosisCode>) {
    let mut corrected = Level::new();
    let mut dropped = BTreeSet::new();

    for (key, bucket) in published {
        let disease = match &key.disease {
            Some(code) => match corrections.resolve(code) {
                Some(fixed) => Some(fixed.clone()),
                None => {
                    dropped.insert(code.clone());
                    None
                }
            },
            None => None,
        };
        corrected.entry(key.with_disease(disease)).or_default().absorb(bucket);
    }

    (corrected, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> CollectionId {
        CollectionId::new("bbmri-eric:ID:DE_1:collection:x").unwrap()
    }

    fn row(patient: &str, diagnosis: Option<&str>) -> SampleRecord {
        let row = SampleRecord::new(collection(), patient, "TISSUE")
            .with_sex("female")
            .with_age(35);
        match diagnosis {
            Some(code) => row.with_diagnosis(code),
            None => row,
        }
    }

    fn identity(codes: &[&str]) -> DiagnosisCorrectionMap {
        let mut map = DiagnosisCorrectionMap::new();
        for c in codes {
            let code = DiagnosisCode::parse(c).unwrap();
            map.insert(code.clone(), Some(code));
        }
        map
    }

    #[test]
    fn test_single_bucket_above_floor() {
        let rows: Vec<_> = (0..12).map(|i| row(&format!("p{i}"), Some("C18.0"))).collect();
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model.aggregate_collection(&collection(), &rows, &identity(&["C18.0", "C18"])).unwrap();

        assert_eq!(result.facts.len(), 1);
        let fact = &result.facts[0];
        assert_eq!(fact.sex, Sex::Female);
        assert_eq!(fact.disease.as_ref().unwrap().as_str(), "urn:miriam:icd:C18.0");
        assert_eq!(fact.age_range, "Adult");
        assert_eq!(fact.sample_type, "TISSUE_PARAFFIN_EMBEDDED");
        assert_eq!(fact.number_of_donors, 12);
        assert_eq!(fact.number_of_samples, 12);
        assert_eq!(fact.national_node, "DE");
    }

    #[test]
    fn test_donors_are_distinct_patients() {
        let mut rows: Vec<_> = (0..5).map(|i| row(&format!("p{i}"), None)).collect();
        rows.extend((0..5).map(|i| row(&format!("p{i}"), None)));
        let model = StarModel::new(StarModelPolicy::new(5, 100));
        let result = model.aggregate_collection(&collection(), &rows, &DiagnosisCorrectionMap::new()).unwrap();

        assert_eq!(result.facts[0].number_of_donors, 5);
        assert_eq!(result.facts[0].number_of_samples, 10);
    }

    #[test]
    fn test_under_floor_bucket_is_suppressed() {
        let rows: Vec<_> = (0..4).map(|i| row(&format!("p{i}"), Some("C18.0"))).collect();
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model.aggregate_collection(&collection(), &rows, &identity(&["C18.0"])).unwrap();

        assert!(result.facts.is_empty());
        assert_eq!(result.suppressed.len(), 1);
        assert_eq!(result.suppressed[0].donors, 4);
        assert!(result.suppressed[0].key.disease.is_none());
    }

    #[test]
    fn test_subcategories_pool_into_category() {
        let mut rows: Vec<_> = (0..6).map(|i| row(&format!("a{i}"), Some("C18.0"))).collect();
        rows.extend((0..6).map(|i| row(&format!("b{i}"), Some("C18.2"))));
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model
            .aggregate_collection(&collection(), &rows, &identity(&["C18.0", "C18.2", "C18"]))
            .unwrap();

        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].disease.as_ref().unwrap().bare(), "C18");
        assert_eq!(result.facts[0].number_of_donors, 12);
    }

    #[test]
    fn test_undiagnosed_pool_collects_small_buckets() {
        let mut rows: Vec<_> = (0..4).map(|i| row(&format!("a{i}"), Some("C18.0"))).collect();
        rows.extend((0..3).map(|i| row(&format!("b{i}"), Some("E11.9"))));
        rows.extend((0..3).map(|i| row(&format!("c{i}"), None)));
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model.aggregate_collection(&collection(), &rows, &identity(&[])).unwrap();

        assert_eq!(result.facts.len(), 1);
        assert!(result.facts[0].disease.is_none());
        assert_eq!(result.facts[0].number_of_donors, 10);
        assert!(result.suppressed.is_empty());
    }

    #[test]
    fn test_category_rows_and_generalized_rows_merge() {
        // 5 rows coded C18 plus 5 coded C18.1: neither reaches the floor alone
        let mut rows: Vec<_> = (0..5).map(|i| row(&format!("a{i}"), Some("C18"))).collect();
        rows.extend((0..5).map(|i| row(&format!("b{i}"), Some("C18.1"))));
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model
            .aggregate_collection(&collection(), &rows, &identity(&["C18", "C18.1"]))
            .unwrap();

        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].disease.as_ref().unwrap().bare(), "C18");
    }

    #[test]
    fn test_unresolved_diagnosis_is_removed_not_deleted() {
        let rows: Vec<_> = (0..10).map(|i| row(&format!("p{i}"), Some("Q99.9"))).collect();
        let mut map = DiagnosisCorrectionMap::new();
        map.insert(DiagnosisCode::parse("Q99.9").unwrap(), None);
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model.aggregate_collection(&collection(), &rows, &map).unwrap();

        assert_eq!(result.facts.len(), 1);
        assert!(result.facts[0].disease.is_none());
        assert_eq!(result.dropped_diagnoses.len(), 1);
    }

    #[test]
    fn test_keys_coinciding_after_correction_merge() {
        let mut rows: Vec<_> = (0..10).map(|i| row(&format!("a{i}"), Some("C75.5"))).collect();
        rows.extend((0..10).map(|i| row(&format!("b{i}"), Some("C75"))));
        let mut map = identity(&["C75"]);
        map.insert(DiagnosisCode::parse("C75.5").unwrap(), DiagnosisCode::parse("C75"));
        let model = StarModel::new(StarModelPolicy::new(10, 100));
        let result = model.aggregate_collection(&collection(), &rows, &map).unwrap();

        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].number_of_donors, 20);
        assert_eq!(result.facts[0].number_of_samples, 20);
    }

    #[test]
    fn test_cap_violation_rejects_collection() {
        let mut rows = Vec::new();
        for sex in ["female", "male", "other"] {
            for i in 0..2 {
                rows.push(
                    SampleRecord::new(collection(), format!("{sex}{i}"), "dna")
                        .with_sex(sex)
                        .with_age(40),
                );
            }
        }
        let model = StarModel::new(StarModelPolicy::new(1, 2));
        let result = model.aggregate_collection(&collection(), &rows, &identity(&[])).unwrap();

        assert!(!result.is_publishable());
        assert_eq!(
            result.cap_violation,
            Some(CapViolation {
                fact_count: 3,
                max_facts: 2
            })
        );
    }

    #[test]
    fn test_missing_national_node_is_an_error() {
        let odd = CollectionId::new("local-collection").unwrap();
        let rows = vec![SampleRecord::new(odd.clone(), "p1", "dna")];
        let model = StarModel::new(StarModelPolicy::new(1, 10));
        assert!(model.aggregate_collection(&odd, &rows, &identity(&[])).is_err());

        let model = StarModel::new(
            StarModelPolicy::new(1, 10).with_national_node(Some(CountryCode::new("DE").unwrap())),
        );
        let result = model.aggregate_collection(&odd, &rows, &identity(&[])).unwrap();
        assert_eq!(result.facts[0].national_node, "DE");
    }

    #[test]
    fn test_aggregate_groups_by_collection() {
        let other = CollectionId::new("bbmri-eric:ID:AT_9:collection:y").unwrap();
        let mut rows = vec![row("p1", None)];
        rows.push(SampleRecord::new(other.clone(), "q1", "urine"));
        let model = StarModel::new(StarModelPolicy::new(1, 10));
        let result = model.aggregate(&rows, &identity(&[])).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].collection_id, other);
        assert_eq!(result[0].national_node.as_str(), "AT");
    }
}
