//! Integration tests for fact table replacement
//!
//! These tests verify that:
//! - A collection's facts are replaced as a whole, page by page
//! - Refusals by the national node fall back to the global endpoint
//! - A phase refused by both endpoints fails the replacement
//! - Dry runs never write

mod common;

use common::{collection_id, InMemoryDirectory, Misbehaviour, Side};
use directory_sync::adapters::directory::Endpoint;
use directory_sync::core::sync::FactSynchronizer;
use directory_sync::domain::{
    CollectionId, CountryCode, DirectoryError, Fact, FactKey, Sex, SyncError,
};
use std::sync::Arc;

fn de() -> CountryCode {
    CountryCode::new("DE").unwrap()
}

fn facts(collection: &CollectionId, count: usize, donors: usize) -> Vec<Fact> {
    (0..count)
        .map(|i| {
            let key = FactKey {
                collection_id: collection.clone(),
                sex: Sex::Female,
                disease: None,
                age_range: format!("range-{i}"),
                sample_type: "SERUM".to_string(),
            };
            Fact::from_key(&key, donors, donors, &de())
        })
        .collect()
}

fn ids(facts: &[Fact]) -> Vec<String> {
    let mut ids: Vec<String> = facts.iter().map(|f| f.id.clone()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_replace_into_empty_directory() {
    let directory = Arc::new(InMemoryDirectory::new());
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);
    let collection = collection_id("a");
    let new = facts(&collection, 3, 10);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &new)
        .await
        .unwrap();

    assert_eq!(report.existing, 0);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.inserted, 3);
    assert!(!report.dry_run);
    assert_eq!(ids(&directory.facts_of(&collection)), ids(&new));
    assert_eq!(
        directory.calls_to("insert_facts"),
        vec![Endpoint::Country(de())]
    );
}

#[tokio::test]
async fn test_replace_lists_every_page() {
    let collection = collection_id("a");
    let other = collection_id("b");
    let old = facts(&collection, 5, 12);
    let untouched = facts(&other, 2, 12);

    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_page_size(2)
            .with_facts(old.clone())
            .with_facts(untouched.clone()),
    );
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);
    let new = facts(&collection, 2, 20);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &new)
        .await
        .unwrap();

    assert_eq!(report.existing, 5);
    assert_eq!(report.deleted, 5);
    assert_eq!(report.inserted, 2);
    // three full or partial pages, then the empty one
    assert_eq!(directory.calls_to("list_fact_ids").len(), 4);

    let stored = directory.facts_of(&collection);
    assert_eq!(ids(&stored), ids(&new));
    assert!(stored.iter().all(|f| f.number_of_donors == 20));
    assert_eq!(ids(&directory.facts_of(&other)), ids(&untouched));
}

#[tokio::test]
async fn test_replace_is_idempotent() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new());
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);
    let new = facts(&collection, 4, 10);

    synchronizer
        .replace_facts(&collection, Some(&de()), &new)
        .await
        .unwrap();
    let first = directory.facts_of(&collection);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &new)
        .await
        .unwrap();

    assert_eq!(report.existing, 4);
    assert_eq!(directory.facts_of(&collection), first);
}

#[tokio::test]
async fn test_empty_fact_set_clears_collection() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new().with_facts(facts(&collection, 3, 10)));
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &[])
        .await
        .unwrap();

    assert_eq!(report.deleted, 3);
    assert_eq!(report.inserted, 0);
    assert!(directory.facts_of(&collection).is_empty());
    assert!(directory.calls_to("insert_facts").is_empty());
}

#[tokio::test]
async fn test_refused_insert_falls_back_to_global() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new());
    directory.always("insert_facts", Side::Country, Misbehaviour::Refuse);
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);
    let new = facts(&collection, 2, 10);

    synchronizer
        .replace_facts(&collection, Some(&de()), &new)
        .await
        .unwrap();

    assert_eq!(
        directory.calls_to("insert_facts"),
        vec![Endpoint::Country(de()), Endpoint::Global]
    );
    assert_eq!(ids(&directory.facts_of(&collection)), ids(&new));
}

#[tokio::test]
async fn test_failed_listing_falls_back_to_global() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new().with_facts(facts(&collection, 3, 10)));
    directory.always("list_fact_ids", Side::Country, Misbehaviour::Fail);
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &[])
        .await
        .unwrap();

    assert_eq!(report.existing, 3);
    assert!(directory.facts_of(&collection).is_empty());
}

#[tokio::test]
async fn test_without_country_only_global_is_used() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new());
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);

    synchronizer
        .replace_facts(&collection, None, &facts(&collection, 1, 10))
        .await
        .unwrap();

    assert_eq!(directory.calls_to("insert_facts"), vec![Endpoint::Global]);
}

#[tokio::test]
async fn test_delete_refused_by_both_endpoints_fails() {
    let collection = collection_id("a");
    let old = facts(&collection, 2, 10);
    let directory = Arc::new(InMemoryDirectory::new().with_facts(old.clone()));
    directory.always("delete_facts", Side::Country, Misbehaviour::Refuse);
    directory.always("delete_facts", Side::Global, Misbehaviour::Fail);
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, false);

    let err = synchronizer
        .replace_facts(&collection, Some(&de()), &facts(&collection, 3, 10))
        .await
        .unwrap_err();

    match err {
        SyncError::Directory(DirectoryError::BothEndpointsFailed {
            operation,
            country,
            global,
        }) => {
            assert_eq!(operation, "delete_facts");
            assert!(country.contains("refused"));
            assert!(global.contains("503"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // nothing was inserted after the failed delete
    assert_eq!(ids(&directory.facts_of(&collection)), ids(&old));
    assert!(directory.calls_to("insert_facts").is_empty());
}

#[tokio::test]
async fn test_inserts_are_batched() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new());
    let synchronizer = FactSynchronizer::new(directory.clone(), 2, false);

    synchronizer
        .replace_facts(&collection, Some(&de()), &facts(&collection, 5, 10))
        .await
        .unwrap();

    assert_eq!(directory.calls_to("insert_facts").len(), 3);
    assert_eq!(directory.facts_of(&collection).len(), 5);
}

#[tokio::test]
async fn test_fallback_applies_per_batch() {
    let collection = collection_id("a");
    let directory = Arc::new(InMemoryDirectory::new());
    directory.times("insert_facts", Side::Country, Misbehaviour::Refuse, 1);
    let synchronizer = FactSynchronizer::new(directory.clone(), 2, false);

    synchronizer
        .replace_facts(&collection, Some(&de()), &facts(&collection, 4, 10))
        .await
        .unwrap();

    assert_eq!(
        directory.calls_to("insert_facts"),
        vec![
            Endpoint::Country(de()),
            Endpoint::Global,
            Endpoint::Country(de()),
        ]
    );
}

#[tokio::test]
async fn test_dry_run_lists_but_never_writes() {
    let collection = collection_id("a");
    let old = facts(&collection, 3, 10);
    let directory = Arc::new(InMemoryDirectory::new().with_facts(old.clone()));
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, true);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &facts(&collection, 7, 10))
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.existing, 3);
    assert_eq!(report.deleted, 3);
    assert_eq!(report.inserted, 7);
    assert_eq!(directory.write_calls(), 0);
    assert_eq!(ids(&directory.facts_of(&collection)), ids(&old));
}

#[tokio::test]
async fn test_listing_stops_when_server_repeats_a_page() {
    let collection = collection_id("a");
    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_page_size(2)
            .ignoring_offset()
            .with_facts(facts(&collection, 5, 10)),
    );
    let synchronizer = FactSynchronizer::new(directory.clone(), 100, true);

    let report = synchronizer
        .replace_facts(&collection, Some(&de()), &[])
        .await
        .unwrap();

    assert_eq!(report.existing, 2);
    assert_eq!(directory.calls_to("list_fact_ids").len(), 2);
}
