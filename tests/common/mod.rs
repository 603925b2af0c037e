//! Shared test doubles: an in-memory Directory and sample store

#![allow(dead_code)]

use async_trait::async_trait;
use directory_sync::adapters::directory::{DirectoryApi, DirectoryResult, Endpoint};
use directory_sync::adapters::store::{DiagnosisScope, SampleStore};
use directory_sync::domain::{
    BiobankAttributes, BiobankId, CollectionAttributes, CollectionId, DirectoryError, Fact,
    Result, SampleRecord, StoreError,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Which side of the Directory a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Country,
    Global,
}

impl Side {
    fn of(endpoint: &Endpoint) -> Self {
        match endpoint {
            Endpoint::Country(_) => Side::Country,
            Endpoint::Global => Side::Global,
        }
    }
}

/// How an endpoint misbehaves for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misbehaviour {
    /// Answers `false` / `None`
    Refuse,
    /// Answers with a server error
    Fail,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    misbehaviour: Misbehaviour,
    /// Remaining calls the rule applies to; `None` means forever
    remaining: Option<usize>,
}

#[derive(Default)]
struct State {
    facts: BTreeMap<String, Fact>,
    collections: BTreeMap<String, CollectionAttributes>,
    biobanks: BTreeMap<String, BiobankAttributes>,
    valid_codes: BTreeSet<String>,
    rules: HashMap<(&'static str, Side), Rule>,
    calls: Vec<(&'static str, Endpoint)>,
    collection_writes: Vec<CollectionAttributes>,
    biobank_writes: Vec<BiobankAttributes>,
}

/// Directory double shared by the country and the global endpoint
pub struct InMemoryDirectory {
    state: Mutex<State>,
    page_size: usize,
    ignore_offset: bool,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 100,
            ignore_offset: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Serve the first page whatever page is asked for
    pub fn ignoring_offset(mut self) -> Self {
        self.ignore_offset = true;
        self
    }

    pub fn with_valid_codes<'a>(self, codes: impl IntoIterator<Item = &'a str>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .valid_codes
                .extend(codes.into_iter().map(|c| format!("urn:miriam:icd:{c}")));
        }
        self
    }

    pub fn with_collection(self, collection: CollectionAttributes) -> Self {
        self.state
            .lock()
            .unwrap()
            .collections
            .insert(collection.id.to_string(), collection);
        self
    }

    pub fn with_biobank(self, biobank: BiobankAttributes) -> Self {
        self.state
            .lock()
            .unwrap()
            .biobanks
            .insert(biobank.id.to_string(), biobank);
        self
    }

    pub fn with_facts(self, facts: impl IntoIterator<Item = Fact>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for fact in facts {
                state.facts.insert(fact.id.clone(), fact);
            }
        }
        self
    }

    /// `operation` misbehaves on `side` from now on
    pub fn always(&self, operation: &'static str, side: Side, misbehaviour: Misbehaviour) {
        self.state.lock().unwrap().rules.insert(
            (operation, side),
            Rule {
                misbehaviour,
                remaining: None,
            },
        );
    }

    /// `operation` misbehaves on `side` for the next `times` calls
    pub fn times(
        &self,
        operation: &'static str,
        side: Side,
        misbehaviour: Misbehaviour,
        times: usize,
    ) {
        self.state.lock().unwrap().rules.insert(
            (operation, side),
            Rule {
                misbehaviour,
                remaining: Some(times),
            },
        );
    }

    pub fn clear_rules(&self) {
        self.state.lock().unwrap().rules.clear();
    }

    pub fn facts(&self) -> Vec<Fact> {
        self.state.lock().unwrap().facts.values().cloned().collect()
    }

    pub fn facts_of(&self, collection_id: &CollectionId) -> Vec<Fact> {
        self.facts()
            .into_iter()
            .filter(|f| &f.collection == collection_id)
            .collect()
    }

    pub fn collection(&self, id: &CollectionId) -> Option<CollectionAttributes> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(id.as_str())
            .cloned()
    }

    pub fn biobank(&self, id: &BiobankId) -> Option<BiobankAttributes> {
        self.state.lock().unwrap().biobanks.get(id.as_str()).cloned()
    }

    pub fn collection_writes(&self) -> usize {
        self.state.lock().unwrap().collection_writes.len()
    }

    pub fn biobank_writes(&self) -> usize {
        self.state.lock().unwrap().biobank_writes.len()
    }

    /// Endpoints `operation` was sent to, in call order
    pub fn calls_to(&self, operation: &str) -> Vec<Endpoint> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, endpoint)| endpoint.clone())
            .collect()
    }

    pub fn write_calls(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(op, _)| {
                op.starts_with("delete") || op.starts_with("insert") || op.starts_with("put")
            })
            .count()
    }

    /// Record the call and apply a matching rule
    fn enter(&self, operation: &'static str, endpoint: &Endpoint) -> Option<Misbehaviour> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((operation, endpoint.clone()));

        let key = (operation, Side::of(endpoint));
        let rule = state.rules.get_mut(&key)?;
        let misbehaviour = rule.misbehaviour;
        match rule.remaining.as_mut() {
            Some(0) => return None,
            Some(n) => *n -= 1,
            None => {}
        }
        Some(misbehaviour)
    }
}

fn server_error(operation: &str) -> DirectoryError {
    DirectoryError::Rejected {
        status: 503,
        message: format!("{operation} unavailable"),
    }
}

#[async_trait]
impl DirectoryApi for InMemoryDirectory {
    async fn validate_diagnosis(&self, endpoint: &Endpoint, code: &str) -> DirectoryResult<bool> {
        match self.enter("validate_diagnosis", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(false),
            Some(Misbehaviour::Fail) => return Err(server_error("validate_diagnosis")),
            None => {}
        }
        Ok(self.state.lock().unwrap().valid_codes.contains(code))
    }

    async fn list_fact_ids(
        &self,
        endpoint: &Endpoint,
        collection_id: &CollectionId,
        page: usize,
    ) -> DirectoryResult<Vec<String>> {
        match self.enter("list_fact_ids", endpoint) {
            Some(Misbehaviour::Refuse) => {
                return Err(DirectoryError::Rejected {
                    status: 403,
                    message: "forbidden".to_string(),
                })
            }
            Some(Misbehaviour::Fail) => return Err(server_error("list_fact_ids")),
            None => {}
        }

        let page = if self.ignore_offset { 0 } else { page };
        let state = self.state.lock().unwrap();
        Ok(state
            .facts
            .values()
            .filter(|f| &f.collection == collection_id)
            .skip(page * self.page_size)
            .take(self.page_size)
            .map(|f| f.id.clone())
            .collect())
    }

    async fn delete_facts(&self, endpoint: &Endpoint, ids: &[String]) -> DirectoryResult<bool> {
        match self.enter("delete_facts", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(false),
            Some(Misbehaviour::Fail) => return Err(server_error("delete_facts")),
            None => {}
        }
        let mut state = self.state.lock().unwrap();
        for id in ids {
            state.facts.remove(id);
        }
        Ok(true)
    }

    async fn insert_facts(&self, endpoint: &Endpoint, facts: &[Fact]) -> DirectoryResult<bool> {
        match self.enter("insert_facts", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(false),
            Some(Misbehaviour::Fail) => return Err(server_error("insert_facts")),
            None => {}
        }
        let mut state = self.state.lock().unwrap();
        for fact in facts {
            state.facts.insert(fact.id.clone(), fact.clone());
        }
        Ok(true)
    }

    async fn get_collection(
        &self,
        endpoint: &Endpoint,
        id: &CollectionId,
    ) -> DirectoryResult<Option<CollectionAttributes>> {
        match self.enter("get_collection", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(None),
            Some(Misbehaviour::Fail) => return Err(server_error("get_collection")),
            None => {}
        }
        Ok(self.collection(id))
    }

    async fn put_collection(
        &self,
        endpoint: &Endpoint,
        collection: &CollectionAttributes,
    ) -> DirectoryResult<bool> {
        match self.enter("put_collection", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(false),
            Some(Misbehaviour::Fail) => return Err(server_error("put_collection")),
            None => {}
        }
        let mut state = self.state.lock().unwrap();
        state.collection_writes.push(collection.clone());
        state
            .collections
            .insert(collection.id.to_string(), collection.clone());
        Ok(true)
    }

    async fn get_biobank(
        &self,
        endpoint: &Endpoint,
        id: &BiobankId,
    ) -> DirectoryResult<Option<BiobankAttributes>> {
        match self.enter("get_biobank", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(None),
            Some(Misbehaviour::Fail) => return Err(server_error("get_biobank")),
            None => {}
        }
        Ok(self.biobank(id))
    }

    async fn put_biobank(
        &self,
        endpoint: &Endpoint,
        biobank: &BiobankAttributes,
    ) -> DirectoryResult<bool> {
        match self.enter("put_biobank", endpoint) {
            Some(Misbehaviour::Refuse) => return Ok(false),
            Some(Misbehaviour::Fail) => return Err(server_error("put_biobank")),
            None => {}
        }
        let mut state = self.state.lock().unwrap();
        state.biobank_writes.push(biobank.clone());
        state.biobanks.insert(biobank.id.to_string(), biobank.clone());
        Ok(true)
    }

    fn base_url(&self) -> &str {
        "memory://directory"
    }
}

/// Sample store double over a fixed set of rows
#[derive(Default)]
pub struct InMemoryStore {
    rows: Vec<SampleRecord>,
    /// Collections whose rows cannot be read
    broken: BTreeSet<String>,
    /// Calls to fetch_sample_records that fail before the store recovers
    outages: AtomicUsize,
}

impl InMemoryStore {
    pub fn new(rows: Vec<SampleRecord>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_broken_collection(mut self, collection_id: &CollectionId) -> Self {
        self.broken.insert(collection_id.to_string());
        self
    }

    /// The next `calls` row fetches fail
    pub fn with_outage(self, calls: usize) -> Self {
        self.outages.store(calls, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl SampleStore for InMemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn list_collection_ids(&self) -> Result<Vec<CollectionId>> {
        let ids: BTreeSet<CollectionId> =
            self.rows.iter().map(|r| r.collection_id.clone()).collect();
        Ok(ids.into_iter().collect())
    }

    async fn fetch_sample_records(&self, collection_id: &CollectionId) -> Result<Vec<SampleRecord>> {
        let remaining = self.outages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.outages.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("store offline".to_string()).into());
        }
        if self.broken.contains(collection_id.as_str()) {
            return Err(StoreError::InvalidData(format!("rows of {collection_id}")).into());
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| &r.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn fetch_raw_diagnoses(&self, scope: &DiagnosisScope) -> Result<Vec<String>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| scope.includes(&r.collection_id))
            .filter_map(|r| r.diagnosis().map(str::to_string))
            .collect())
    }
}

pub fn collection_id(local: &str) -> CollectionId {
    CollectionId::new(format!("bbmri-eric:ID:DE_1:collection:{local}")).unwrap()
}

pub fn biobank_id() -> BiobankId {
    BiobankId::new("bbmri-eric:ID:DE_1").unwrap()
}

/// `donors` donors with one sample each, all in the same star model bucket
pub fn donors(
    collection: &CollectionId,
    prefix: &str,
    donors: usize,
    diagnosis: &str,
) -> Vec<SampleRecord> {
    (0..donors)
        .map(|i| {
            SampleRecord::new(collection.clone(), format!("{prefix}-{i}"), "serum")
                .with_sex("female")
                .with_diagnosis(diagnosis)
                .with_age(50)
        })
        .collect()
}
