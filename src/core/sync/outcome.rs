//! Run outcome and reporting
//!
//! Every attempt of a synchronization run produces one [`SyncOutcome`]. It
//! holds the stages visited, one report per collection and entity, every
//! failure with its context, and the run-scoped diagnostics of the
//! normalization and aggregation steps. Nothing is dropped from an outcome
//! once recorded.

use crate::core::aggregation::{CapViolation, SuppressedBucket};
use crate::core::diagnosis::FallbackReason;
use crate::domain::{CollectionId, DiagnosisCode};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// States of a synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    CorrectingDiagnoses,
    Aggregating,
    SynchronizingFacts,
    ReconcilingEntities,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "Idle",
            Stage::CorrectingDiagnoses => "CorrectingDiagnoses",
            Stage::Aggregating => "Aggregating",
            Stage::SynchronizingFacts => "SynchronizingFacts",
            Stage::ReconcilingEntities => "ReconcilingEntities",
            Stage::Done => "Done",
            Stage::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Type of a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Clinical sample store
    Store,
    /// Directory, after both endpoints were tried
    Directory,
    /// Privacy or volume policy (fact cap)
    Policy,
    /// Data that cannot be published as is
    Validation,
    /// Shutdown requested during the run
    Cancelled,
}

impl FailureKind {
    /// Whether another attempt of the run may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Store | FailureKind::Directory)
    }
}

/// One failure, with the stage it happened in
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
    /// Collection or entity the failure is about
    pub context: Option<String>,
}

impl StageFailure {
    pub fn new(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A visited stage
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `false` when the stage ended the run
    pub completed: bool,
}

/// Fact replacement result of one collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Facts found in the Directory before the replacement
    pub existing: usize,
    pub deleted: usize,
    pub inserted: usize,
    /// Nothing was written
    pub dry_run: bool,
}

/// What happened to one collection
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub collection_id: CollectionId,
    /// Sample rows read from the store
    pub rows: usize,
    /// Facts computed by the star model
    pub facts: usize,
    pub suppressed: Vec<SuppressedBucket>,
    pub dropped_diagnoses: Vec<DiagnosisCode>,
    pub cap_violation: Option<CapViolation>,
    /// Set once the facts were replaced (or would have been, in a dry run)
    pub replaced: Option<ReplaceReport>,
}

impl CollectionReport {
    pub fn new(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            rows: 0,
            facts: 0,
            suppressed: Vec::new(),
            dropped_diagnoses: Vec::new(),
            cap_violation: None,
            replaced: None,
        }
    }
}

/// Kind of Directory entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Collection,
    Biobank,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Collection => f.write_str("collection"),
            EntityKind::Biobank => f.write_str("biobank"),
        }
    }
}

/// Result of reconciling one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityChange {
    /// Local values already match the Directory
    Unchanged,
    /// The entity was written
    Updated,
    /// The entity differs but the run is a dry run
    WouldUpdate,
}

#[derive(Debug, Clone)]
pub struct EntityReport {
    pub kind: EntityKind,
    pub id: String,
    pub change: EntityChange,
}

/// Observations made while correcting diagnoses
#[derive(Debug, Clone, Default)]
pub struct RunDiagnostics {
    /// Raw codes that fell back to the unspecified-illness code
    pub normalization_fallbacks: BTreeMap<String, FallbackReason>,
    /// Canonical codes without any code accepted by the Directory
    pub unresolved_codes: Vec<DiagnosisCode>,
    /// Entries of the correction map
    pub corrections: usize,
}

/// Outcome of one attempt of a synchronization run
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub run_id: Uuid,
    /// 1-based attempt number within the failover loop
    pub attempt: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Last state reached
    pub stage: Stage,
    pub stages: Vec<StageRecord>,
    pub collections: Vec<CollectionReport>,
    pub entities: Vec<EntityReport>,
    pub failures: Vec<StageFailure>,
    pub diagnostics: RunDiagnostics,
}

impl SyncOutcome {
    pub fn new(run_id: Uuid, attempt: usize, dry_run: bool) -> Self {
        Self {
            run_id,
            attempt,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            stage: Stage::Idle,
            stages: Vec::new(),
            collections: Vec::new(),
            entities: Vec::new(),
            failures: Vec::new(),
            diagnostics: RunDiagnostics::default(),
        }
    }

    /// Record a failure
    pub fn add_failure(&mut self, failure: StageFailure) {
        tracing::warn!(
            stage = %failure.stage,
            kind = ?failure.kind,
            context = failure.context.as_deref().unwrap_or(""),
            message = %failure.message,
            "Synchronization failure"
        );
        self.failures.push(failure);
    }

    /// Report of a collection, if it was visited
    pub fn collection(&self, collection_id: &CollectionId) -> Option<&CollectionReport> {
        self.collections
            .iter()
            .find(|report| &report.collection_id == collection_id)
    }

    /// The run reached `Done` without a single failure
    pub fn is_success(&self) -> bool {
        self.stage == Stage::Done && self.failures.is_empty()
    }

    /// Another attempt might change the result
    pub fn should_retry(&self) -> bool {
        if self.failures.iter().any(|f| f.kind == FailureKind::Cancelled) {
            return false;
        }
        self.stage == Stage::Failed || self.failures.iter().any(|f| f.kind.is_retryable())
    }

    /// Collections with at least one failure, in report order
    pub fn failed_collections(&self) -> Vec<&CollectionId> {
        self.collections
            .iter()
            .map(|report| &report.collection_id)
            .filter(|id| {
                self.failures
                    .iter()
                    .any(|f| f.context.as_deref() == Some(id.as_str()))
            })
            .collect()
    }

    /// Facts written (or that would have been written) by this attempt
    pub fn facts_inserted(&self) -> usize {
        self.collections
            .iter()
            .filter_map(|report| report.replaced.as_ref())
            .map(|replaced| replaced.inserted)
            .sum()
    }

    /// Log the outcome
    pub fn log_summary(&self) {
        let duration_secs = self
            .finished_at
            .map(|end| (end - self.started_at).num_seconds())
            .unwrap_or(0);

        tracing::info!(
            run_id = %self.run_id,
            attempt = self.attempt,
            stage = %self.stage,
            dry_run = self.dry_run,
            collections = self.collections.len(),
            facts_inserted = self.facts_inserted(),
            entities_updated = self
                .entities
                .iter()
                .filter(|e| e.change != EntityChange::Unchanged)
                .count(),
            normalization_fallbacks = self.diagnostics.normalization_fallbacks.len(),
            unresolved_codes = self.diagnostics.unresolved_codes.len(),
            duration_secs = duration_secs,
            "Synchronization finished"
        );

        for report in &self.collections {
            tracing::info!(
                collection_id = %report.collection_id,
                rows = report.rows,
                facts = report.facts,
                suppressed_buckets = report.suppressed.len(),
                dropped_diagnoses = report.dropped_diagnoses.len(),
                deleted = report.replaced.as_ref().map(|r| r.deleted).unwrap_or(0),
                inserted = report.replaced.as_ref().map(|r| r.inserted).unwrap_or(0),
                "Collection summary"
            );
        }

        if !self.failures.is_empty() {
            tracing::warn!(
                failure_count = self.failures.len(),
                "Synchronization completed with failures"
            );
            for failure in &self.failures {
                tracing::warn!(
                    stage = %failure.stage,
                    kind = ?failure.kind,
                    context = failure.context.as_deref().unwrap_or(""),
                    message = %failure.message,
                    "Synchronization failure"
                );
            }
        }
    }
}

/// Outcomes of every attempt of a failover run
#[derive(Debug, Clone)]
pub struct FailoverReport {
    pub attempts: Vec<SyncOutcome>,
}

impl FailoverReport {
    /// The authoritative outcome: the last attempt
    pub fn outcome(&self) -> Option<&SyncOutcome> {
        self.attempts.last()
    }

    pub fn is_success(&self) -> bool {
        self.outcome().is_some_and(SyncOutcome::is_success)
    }
}
