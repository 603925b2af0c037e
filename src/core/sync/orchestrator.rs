//! Synchronization run orchestrator
//!
//! One run walks `Idle → CorrectingDiagnoses → Aggregating →
//! SynchronizingFacts → ReconcilingEntities → Done`, or ends in `Failed` when
//! a stage cannot produce what the next one needs. Failures of a single
//! collection or entity are recorded and the run moves on.
//!
//! [`SyncOrchestrator::run_with_failover`] repeats the run up to `retry_max`
//! times, sleeping `retry_interval` between attempts.

use crate::adapters::directory::{DirectoryApi, DirectoryCodeValidator};
use crate::adapters::store::{DiagnosisScope, SampleStore};
use crate::config::SyncConfig;
use crate::core::aggregation::{collection_profile, CollectionAggregate, StarModel, StarModelPolicy};
use crate::core::diagnosis::{build_corrections, DiagnosisCorrectionMap};
use crate::core::sync::entities::EntityReconciler;
use crate::core::sync::facts::FactSynchronizer;
use crate::core::sync::outcome::{
    CollectionReport, EntityKind, EntityReport, FailoverReport, FailureKind, Stage, StageFailure,
    StageRecord, SyncOutcome,
};
use crate::domain::{
    AgeBracket, BiobankAttributes, CollectionAttributes, CollectionId, CountryCode, Result,
    SyncError,
};
use crate::{log_retry_attempt, log_stage_transition};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Settings of a run, assembled from configuration and command line
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Collections to synchronize; empty means every collection in the store
    pub collection_ids: Vec<CollectionId>,
    pub min_donors: usize,
    pub max_facts: usize,
    pub age_brackets: Vec<AgeBracket>,
    /// National node; derived per collection when absent
    pub national_node: Option<CountryCode>,
    pub batch_size: usize,
    pub dry_run: bool,
    pub update_collections: bool,
    pub update_biobanks: bool,
    pub biobanks: Vec<BiobankAttributes>,
    pub retry_max: usize,
    pub retry_interval: Duration,
}

impl SyncOptions {
    /// Options described by a validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a `[[biobanks]]` entry is invalid
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let biobanks = config
            .biobanks
            .iter()
            .map(|entry| entry.to_attributes().map_err(SyncError::Configuration))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            collection_ids: config.sync.collections(),
            min_donors: config.sync.min_donors,
            max_facts: config.sync.max_facts,
            age_brackets: config.sync.age_ranges.clone(),
            national_node: config.directory.country(),
            batch_size: config.directory.batch_size,
            dry_run: config.application.dry_run,
            update_collections: config.sync.update_collections,
            update_biobanks: config.sync.update_biobanks,
            biobanks,
            retry_max: config.sync.retry_max,
            retry_interval: Duration::from_secs(config.sync.retry_interval_seconds),
        })
    }

    fn policy(&self) -> StarModelPolicy {
        StarModelPolicy::new(self.min_donors, self.max_facts)
            .with_age_brackets(self.age_brackets.clone())
            .with_national_node(self.national_node.clone())
    }
}

/// A collection that made it through aggregation
struct Prepared {
    aggregate: CollectionAggregate,
    profile: CollectionAttributes,
}

/// Sequences the stages of a run and retries failed runs
pub struct SyncOrchestrator {
    store: Arc<dyn SampleStore>,
    directory: Arc<dyn DirectoryApi>,
    options: SyncOptions,
    shutdown: watch::Receiver<bool>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn SampleStore>,
        directory: Arc<dyn DirectoryApi>,
        options: SyncOptions,
    ) -> Self {
        // sender dropped: the receiver keeps reporting `false`
        let (_tx, shutdown) = watch::channel(false);
        Self {
            store,
            directory,
            options,
            shutdown,
        }
    }

    /// Stop between collections and between attempts once `shutdown` turns `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run until an attempt needs no retry or `retry_max` attempts were made
    ///
    /// The first attempt starts immediately. Every attempt's outcome is kept;
    /// the last one is authoritative.
    pub async fn run_with_failover(&self) -> FailoverReport {
        let run_id = Uuid::new_v4();
        let max_attempts = self.options.retry_max.max(1);
        let mut attempts: Vec<SyncOutcome> = Vec::new();

        for attempt in 1..=max_attempts {
            if let Some(previous) = attempts.last() {
                let reason = previous
                    .failures
                    .last()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| format!("run ended in {}", previous.stage));
                log_retry_attempt!(attempt, max_attempts, reason);

                if !self.pause(self.options.retry_interval).await {
                    tracing::info!("Shutdown requested; not retrying");
                    break;
                }
            }

            let outcome = self.run_once(run_id, attempt).await;
            outcome.log_summary();
            let retry = outcome.should_retry();
            attempts.push(outcome);

            if !retry || self.shutdown_requested() {
                break;
            }
        }

        if attempts.last().is_some_and(SyncOutcome::should_retry) {
            tracing::error!(
                run_id = %run_id,
                attempts = attempts.len(),
                "Synchronization failed after all attempts"
            );
        }

        FailoverReport { attempts }
    }

    /// Sleep unless shutdown is requested first; `false` means stop
    async fn pause(&self, interval: Duration) -> bool {
        if self.shutdown_requested() {
            return false;
        }
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(interval) => true,
            changed = shutdown.changed() => match changed {
                Ok(()) => !*shutdown.borrow(),
                // sender gone, nobody can request shutdown any more
                Err(_) => {
                    tokio::time::sleep(interval).await;
                    true
                }
            },
        }
    }

    /// One pass of the state machine
    pub async fn run_once(&self, run_id: Uuid, attempt: usize) -> SyncOutcome {
        let mut outcome = SyncOutcome::new(run_id, attempt, self.options.dry_run);
        tracing::info!(
            run_id = %run_id,
            attempt = attempt,
            dry_run = self.options.dry_run,
            "Starting synchronization run"
        );

        let started = self.enter(&mut outcome, Stage::CorrectingDiagnoses);
        let (collection_ids, corrections) = match self.correct_diagnoses(&mut outcome).await {
            Ok(result) => result,
            Err(e) => {
                let failure =
                    StageFailure::new(Stage::CorrectingDiagnoses, failure_kind(&e), e.to_string());
                return self.fail(outcome, started, failure);
            }
        };
        self.leave(&mut outcome, started);

        let started = self.enter(&mut outcome, Stage::Aggregating);
        let prepared = self.aggregate(&collection_ids, &corrections, &mut outcome).await;
        self.leave(&mut outcome, started);

        let started = self.enter(&mut outcome, Stage::SynchronizingFacts);
        if let Err(failure) = self.synchronize_facts(&prepared, &mut outcome).await {
            return self.fail(outcome, started, failure);
        }
        self.leave(&mut outcome, started);

        let started = self.enter(&mut outcome, Stage::ReconcilingEntities);
        if let Err(failure) = self.reconcile_entities(&prepared, &mut outcome).await {
            return self.fail(outcome, started, failure);
        }
        self.leave(&mut outcome, started);

        log_stage_transition!(outcome.stage, Stage::Done);
        outcome.stage = Stage::Done;
        outcome.finished_at = Some(Utc::now());
        outcome
    }

    fn enter(&self, outcome: &mut SyncOutcome, stage: Stage) -> chrono::DateTime<Utc> {
        log_stage_transition!(outcome.stage, stage);
        outcome.stage = stage;
        Utc::now()
    }

    fn leave(&self, outcome: &mut SyncOutcome, started_at: chrono::DateTime<Utc>) {
        outcome.stages.push(StageRecord {
            stage: outcome.stage,
            started_at,
            finished_at: Utc::now(),
            completed: true,
        });
    }

    fn fail(
        &self,
        mut outcome: SyncOutcome,
        started_at: chrono::DateTime<Utc>,
        failure: StageFailure,
    ) -> SyncOutcome {
        outcome.stages.push(StageRecord {
            stage: outcome.stage,
            started_at,
            finished_at: Utc::now(),
            completed: false,
        });
        outcome.add_failure(failure);
        log_stage_transition!(outcome.stage, Stage::Failed);
        outcome.stage = Stage::Failed;
        outcome.finished_at = Some(Utc::now());
        outcome
    }

    /// Collections of the run and the correction map of their diagnoses
    async fn correct_diagnoses(
        &self,
        outcome: &mut SyncOutcome,
    ) -> Result<(Vec<CollectionId>, DiagnosisCorrectionMap)> {
        let collection_ids = if self.options.collection_ids.is_empty() {
            self.store.list_collection_ids().await?
        } else {
            self.options.collection_ids.clone()
        };
        tracing::info!(collections = collection_ids.len(), "Collections selected");

        let scope = DiagnosisScope::Collections(collection_ids.clone());
        let raw_codes = self.store.fetch_raw_diagnoses(&scope).await?;

        let country = self
            .options
            .national_node
            .clone()
            .or_else(|| shared_country(&collection_ids));
        let validator = DirectoryCodeValidator::new(self.directory.clone(), country);
        let corrections = build_corrections(&raw_codes, &validator).await?;

        outcome.diagnostics.corrections = corrections.len();
        outcome.diagnostics.normalization_fallbacks = corrections.normalization_fallbacks().clone();
        outcome.diagnostics.unresolved_codes = corrections.unresolved().cloned().collect();

        tracing::info!(
            raw_codes = raw_codes.len(),
            corrections = corrections.len(),
            unresolved = outcome.diagnostics.unresolved_codes.len(),
            fallbacks = outcome.diagnostics.normalization_fallbacks.len(),
            "Diagnosis corrections built"
        );

        Ok((collection_ids, corrections))
    }

    async fn aggregate(
        &self,
        collection_ids: &[CollectionId],
        corrections: &DiagnosisCorrectionMap,
        outcome: &mut SyncOutcome,
    ) -> Vec<Prepared> {
        let model = StarModel::new(self.options.policy());
        let mut prepared = Vec::new();

        for collection_id in collection_ids {
            let mut report = CollectionReport::new(collection_id.clone());

            let rows = match self.store.fetch_sample_records(collection_id).await {
                Ok(rows) => rows,
                Err(e) => {
                    outcome.add_failure(
                        StageFailure::new(Stage::Aggregating, failure_kind(&e), e.to_string())
                            .with_context(collection_id.as_str()),
                    );
                    outcome.collections.push(report);
                    continue;
                }
            };
            report.rows = rows.len();

            let aggregate = match model.aggregate_collection(collection_id, &rows, corrections) {
                Ok(aggregate) => aggregate,
                Err(e) => {
                    outcome.add_failure(
                        StageFailure::new(Stage::Aggregating, failure_kind(&e), e.to_string())
                            .with_context(collection_id.as_str()),
                    );
                    outcome.collections.push(report);
                    continue;
                }
            };

            report.facts = aggregate.facts.len();
            report.suppressed = aggregate.suppressed.clone();
            report.dropped_diagnoses = aggregate.dropped_diagnoses.iter().cloned().collect();
            report.cap_violation = aggregate.cap_violation.clone();

            if let Some(violation) = &aggregate.cap_violation {
                outcome.add_failure(
                    StageFailure::new(
                        Stage::Aggregating,
                        FailureKind::Policy,
                        format!(
                            "{} facts exceed the maximum of {}; facts left untouched",
                            violation.fact_count, violation.max_facts
                        ),
                    )
                    .with_context(collection_id.as_str()),
                );
            }

            let profile = collection_profile(collection_id, &rows, corrections);
            outcome.collections.push(report);
            prepared.push(Prepared { aggregate, profile });
        }

        prepared
    }

    async fn synchronize_facts(
        &self,
        prepared: &[Prepared],
        outcome: &mut SyncOutcome,
    ) -> std::result::Result<(), StageFailure> {
        let synchronizer = FactSynchronizer::new(
            self.directory.clone(),
            self.options.batch_size,
            self.options.dry_run,
        );

        for item in prepared {
            self.check_shutdown(Stage::SynchronizingFacts)?;

            let aggregate = &item.aggregate;
            if !aggregate.is_publishable() {
                tracing::warn!(
                    collection_id = %aggregate.collection_id,
                    "Skipping fact replacement of unpublishable collection"
                );
                continue;
            }

            match synchronizer
                .replace_facts(
                    &aggregate.collection_id,
                    Some(&aggregate.national_node),
                    &aggregate.facts,
                )
                .await
            {
                Ok(replaced) => {
                    if let Some(report) = outcome
                        .collections
                        .iter_mut()
                        .find(|r| r.collection_id == aggregate.collection_id)
                    {
                        report.replaced = Some(replaced);
                    }
                }
                Err(e) => outcome.add_failure(
                    StageFailure::new(Stage::SynchronizingFacts, failure_kind(&e), e.to_string())
                        .with_context(aggregate.collection_id.as_str()),
                ),
            }
        }

        Ok(())
    }

    async fn reconcile_entities(
        &self,
        prepared: &[Prepared],
        outcome: &mut SyncOutcome,
    ) -> std::result::Result<(), StageFailure> {
        let reconciler = EntityReconciler::new(self.directory.clone(), self.options.dry_run);

        if self.options.update_collections {
            for item in prepared {
                self.check_shutdown(Stage::ReconcilingEntities)?;

                let id = &item.profile.id;
                let country = Some(&item.aggregate.national_node);
                match reconciler.reconcile_collection(&item.profile, country).await {
                    Ok(change) => outcome.entities.push(EntityReport {
                        kind: EntityKind::Collection,
                        id: id.to_string(),
                        change,
                    }),
                    Err(e) => outcome.add_failure(
                        StageFailure::new(
                            Stage::ReconcilingEntities,
                            failure_kind(&e),
                            e.to_string(),
                        )
                        .with_context(id.as_str()),
                    ),
                }
            }
        }

        if self.options.update_biobanks {
            for biobank in &self.options.biobanks {
                self.check_shutdown(Stage::ReconcilingEntities)?;

                let country = self
                    .options
                    .national_node
                    .clone()
                    .or_else(|| biobank.id.country_code());
                match reconciler.reconcile_biobank(biobank, country.as_ref()).await {
                    Ok(change) => outcome.entities.push(EntityReport {
                        kind: EntityKind::Biobank,
                        id: biobank.id.to_string(),
                        change,
                    }),
                    Err(e) => outcome.add_failure(
                        StageFailure::new(
                            Stage::ReconcilingEntities,
                            failure_kind(&e),
                            e.to_string(),
                        )
                        .with_context(biobank.id.as_str()),
                    ),
                }
            }
        }

        Ok(())
    }

    fn check_shutdown(&self, stage: Stage) -> std::result::Result<(), StageFailure> {
        if self.shutdown_requested() {
            return Err(StageFailure::new(
                stage,
                FailureKind::Cancelled,
                "shutdown requested; remaining work skipped",
            ));
        }
        Ok(())
    }
}

/// National node shared by every collection of the run, if there is exactly one
///
/// Diagnosis codes are checked once per run; with collections of several
/// countries no single node is asked first and the global endpoint answers.
fn shared_country(collection_ids: &[CollectionId]) -> Option<CountryCode> {
    let mut countries = collection_ids.iter().map(CollectionId::country_code);
    let first = countries.next()??;
    countries
        .all(|country| country.as_ref() == Some(&first))
        .then_some(first)
}

fn failure_kind(error: &SyncError) -> FailureKind {
    match error {
        SyncError::Store(_) | SyncError::Io(_) => FailureKind::Store,
        SyncError::Directory(_) => FailureKind::Directory,
        SyncError::Policy(_) => FailureKind::Policy,
        _ => FailureKind::Validation,
    }
}
