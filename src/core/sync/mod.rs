//! Publication of a run's results to the Directory
//!
//! - [`facts`] - full replacement of a collection's facts
//! - [`entities`] - change-aware collection and biobank updates
//! - [`orchestrator`] - the run state machine and its failover loop
//! - [`outcome`] - what a run reports

pub mod entities;
pub mod facts;
pub mod orchestrator;
pub mod outcome;

pub use entities::{reconcile, EntityReconciler, Reconcilable, Tracked};
pub use facts::FactSynchronizer;
pub use orchestrator::{SyncOptions, SyncOrchestrator};
pub use outcome::{
    CollectionReport, EntityChange, EntityKind, EntityReport, FailoverReport, FailureKind,
    ReplaceReport, RunDiagnostics, Stage, StageFailure, StageRecord, SyncOutcome,
};
