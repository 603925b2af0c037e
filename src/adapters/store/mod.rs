//! Clinical sample store integration
//!
//! - [`SampleStore`] - read-only access to pre-shaped sample rows
//! - [`JsonSampleStore`] - rows from a JSON document

pub mod json;
pub mod traits;

pub use json::JsonSampleStore;
pub use traits::{DiagnosisScope, SampleStore};
