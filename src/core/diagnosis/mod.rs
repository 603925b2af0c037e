//! Diagnosis code repair and correction
//!
//! - [`normalizer`] turns raw store codes into canonical ICD-10 codes
//! - [`corrector`] negotiates publishable codes with the Directory

pub mod corrector;
pub mod normalizer;

pub use corrector::{build_corrections, CodeValidator, DiagnosisCorrectionMap};
pub use normalizer::{normalize, normalize_with_reason, FallbackReason, Normalized};
