//! Integration tests for diagnosis correction feeding the star model
//!
//! These tests verify that:
//! - Codes are negotiated with the Directory through both endpoints
//! - Corrected codes end up in the published facts
//! - The donor floor holds for every emitted fact

mod common;

use common::{collection_id, donors, InMemoryDirectory, Misbehaviour, Side};
use directory_sync::adapters::directory::{DirectoryCodeValidator, Endpoint};
use directory_sync::core::aggregation::{StarModel, StarModelPolicy};
use directory_sync::core::diagnosis::{build_corrections, DiagnosisCorrectionMap};
use directory_sync::domain::{CountryCode, DiagnosisCode, SampleRecord, Sex};
use std::sync::Arc;

fn de() -> Option<CountryCode> {
    Some(CountryCode::new("DE").unwrap())
}

fn code(bare: &str) -> DiagnosisCode {
    DiagnosisCode::parse(bare).unwrap()
}

#[tokio::test]
async fn test_rejected_subcategory_is_corrected_to_category() {
    let directory = Arc::new(InMemoryDirectory::new().with_valid_codes(["C75"]));
    let validator = DirectoryCodeValidator::new(directory, de());

    let map = build_corrections(["C75.5"], &validator).await.unwrap();

    assert_eq!(map.resolve(&code("C75.5")), Some(&code("C75")));
    assert_eq!(map.unresolved().count(), 0);
}

#[tokio::test]
async fn test_country_refusal_is_answered_by_global() {
    let directory = Arc::new(InMemoryDirectory::new().with_valid_codes(["C18.0"]));
    directory.always("validate_diagnosis", Side::Country, Misbehaviour::Fail);
    let validator = DirectoryCodeValidator::new(directory.clone(), de());

    let map = build_corrections(["c18,0"], &validator).await.unwrap();

    assert_eq!(map.resolve(&code("C18.0")), Some(&code("C18.0")));
    assert!(directory
        .calls_to("validate_diagnosis")
        .contains(&Endpoint::Global));
}

#[tokio::test]
async fn test_validation_failing_everywhere_aborts() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.always("validate_diagnosis", Side::Country, Misbehaviour::Fail);
    directory.always("validate_diagnosis", Side::Global, Misbehaviour::Fail);
    let validator = DirectoryCodeValidator::new(directory, de());

    assert!(build_corrections(["C18.0"], &validator).await.is_err());
}

#[tokio::test]
async fn test_unknown_code_drops_disease_dimension() {
    let collection = collection_id("a");
    let rows = donors(&collection, "p", 12, "C99.9");

    let directory = Arc::new(InMemoryDirectory::new());
    let validator = DirectoryCodeValidator::new(directory, de());
    let map = build_corrections(rows.iter().filter_map(SampleRecord::diagnosis), &validator)
        .await
        .unwrap();

    let model = StarModel::new(StarModelPolicy::new(10, 10_000));
    let aggregate = model.aggregate_collection(&collection, &rows, &map).unwrap();

    assert_eq!(aggregate.facts.len(), 1);
    assert!(aggregate.facts[0].disease.is_none());
    assert!(aggregate.dropped_diagnoses.contains(&code("C99.9")));
}

#[tokio::test]
async fn test_corrected_code_is_published() {
    let collection = collection_id("a");
    let rows = donors(&collection, "p", 10, "C75.5");

    let directory = Arc::new(InMemoryDirectory::new().with_valid_codes(["C75"]));
    let validator = DirectoryCodeValidator::new(directory, de());
    let map = build_corrections(rows.iter().filter_map(SampleRecord::diagnosis), &validator)
        .await
        .unwrap();

    let model = StarModel::new(StarModelPolicy::new(10, 10_000));
    let aggregate = model.aggregate_collection(&collection, &rows, &map).unwrap();

    assert_eq!(aggregate.facts.len(), 1);
    assert_eq!(aggregate.facts[0].disease, Some(code("C75")));
}

#[test]
fn test_twelve_tissue_donors_make_one_fact() {
    let collection = collection_id("x");
    let rows: Vec<SampleRecord> = (0..12)
        .map(|i| {
            SampleRecord::new(collection.clone(), format!("patient-{i}"), "TISSUE")
                .with_sex("female")
                .with_diagnosis("C18.0")
                .with_age(35)
        })
        .collect();

    let mut map = DiagnosisCorrectionMap::new();
    map.insert(code("C18.0"), Some(code("C18.0")));

    let model = StarModel::new(StarModelPolicy::new(10, 10_000));
    let aggregate = model.aggregate_collection(&collection, &rows, &map).unwrap();

    assert_eq!(aggregate.facts.len(), 1);
    let fact = &aggregate.facts[0];
    assert_eq!(fact.sex, Sex::Female);
    assert_eq!(fact.disease, Some(code("C18.0")));
    assert_eq!(fact.age_range, "Adult");
    assert_eq!(fact.sample_type, "TISSUE_PARAFFIN_EMBEDDED");
    assert_eq!(fact.number_of_donors, 12);
    assert_eq!(fact.number_of_samples, 12);
    assert_eq!(fact.national_node, "DE");
}

#[test]
fn test_small_bucket_survives_only_through_undiagnosed_pool() {
    let collection = collection_id("x");
    let model = StarModel::new(StarModelPolicy::new(10, 10_000));
    let map = DiagnosisCorrectionMap::new();

    // four donors alone: suppressed
    let rows = donors(&collection, "a", 4, "C18.0");
    let aggregate = model.aggregate_collection(&collection, &rows, &map).unwrap();
    assert!(aggregate.facts.is_empty());
    assert_eq!(aggregate.suppressed.len(), 1);

    // joined by six donors of another diagnosis in the same cell: published without disease
    let mut rows = donors(&collection, "a", 4, "C18.0");
    rows.extend(donors(&collection, "b", 6, "C50.1"));
    let aggregate = model.aggregate_collection(&collection, &rows, &map).unwrap();
    assert_eq!(aggregate.facts.len(), 1);
    assert!(aggregate.facts[0].disease.is_none());
    assert_eq!(aggregate.facts[0].number_of_donors, 10);
}

#[test]
fn test_every_fact_reaches_the_donor_floor() {
    let collection = collection_id("x");
    let mut rows = Vec::new();
    for (i, diagnosis) in ["C18.0", "C18.1", "C18.2", "C50.1", "C50.9", "I10", "E11.9"]
        .iter()
        .enumerate()
    {
        rows.extend(donors(&collection, &format!("d{i}"), 3 + i, diagnosis));
    }
    rows.push(
        SampleRecord::new(collection.clone(), "lonely", "dna")
            .with_sex("male")
            .with_age(5),
    );

    let model = StarModel::new(StarModelPolicy::new(10, 10_000));
    let aggregate = model
        .aggregate_collection(&collection, &rows, &DiagnosisCorrectionMap::new())
        .unwrap();

    assert!(!aggregate.facts.is_empty());
    assert!(aggregate.facts.iter().all(|f| f.number_of_donors >= 10));

    let published: usize = aggregate.facts.iter().map(|f| f.number_of_samples).sum();
    let suppressed: usize = aggregate.suppressed.iter().map(|s| s.samples).sum();
    assert_eq!(published + suppressed, rows.len());
}

#[test]
fn test_fact_ids_are_stable_across_runs() {
    let collection = collection_id("x");
    let rows = donors(&collection, "p", 15, "C50.9");
    let model = StarModel::new(StarModelPolicy::new(10, 10_000));
    let map = DiagnosisCorrectionMap::new();

    let first = model.aggregate_collection(&collection, &rows, &map).unwrap();
    let mut reversed = rows.clone();
    reversed.reverse();
    let second = model.aggregate_collection(&collection, &reversed, &map).unwrap();

    assert_eq!(first.facts, second.facts);
}
