//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and an optional
//! rotating JSON file layer. The macros below keep field names consistent
//! across the pipeline stages.
//!
//! # Example
//!
//! ```no_run
//! use directory_sync::logging::init_logging;
//! use directory_sync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a state machine transition of a synchronization run
///
/// # Example
///
/// ```no_run
/// use directory_sync::log_stage_transition;
///
/// log_stage_transition!("Aggregating", "SynchronizingFacts");
/// ```
#[macro_export]
macro_rules! log_stage_transition {
    ($from:expr, $to:expr) => {
        tracing::info!(from = %$from, to = %$to, "Stage transition");
    };
}

/// Log that a Directory call is retried on the country-agnostic endpoint
///
/// # Example
///
/// ```no_run
/// use directory_sync::log_fallback_attempt;
///
/// log_fallback_attempt!("insert_facts", "DE", "status 403");
/// ```
#[macro_export]
macro_rules! log_fallback_attempt {
    ($operation:expr, $country:expr, $reason:expr) => {
        tracing::warn!(
            operation = $operation,
            country = %$country,
            reason = %$reason,
            "Country endpoint refused request; trying global endpoint"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use directory_sync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
