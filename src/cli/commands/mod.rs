//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod check_diagnosis;
pub mod init;
pub mod sync;
pub mod validate;
