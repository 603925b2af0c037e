//! Structured logging setup using tracing
//!
//! Console output for operators plus an optional JSON file with rotation for
//! later audit of what a run published.

use crate::config::LoggingConfig;
use crate::domain::{Result, SyncError};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// File name prefix of the JSON log
pub const LOG_FILE_NAME: &str = "directory-sync.log";

/// Keeps the non-blocking file writer alive; logs are flushed on drop
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system based on configuration
///
/// Installs a console layer and, when `local_enabled`, a JSON layer writing
/// to `<local_path>/directory-sync.log` with daily or hourly rotation.
/// `RUST_LOG` takes precedence over `log_level_str`.
///
/// # Example
///
/// ```no_run
/// use directory_sync::logging::init_logging;
/// use directory_sync::config::LoggingConfig;
///
/// let config = LoggingConfig::default();
/// let _guard = init_logging("info", &config).expect("Failed to initialize logging");
/// // Keep _guard alive for the duration of the program
/// ```
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_level = parse_log_level(log_level_str)?;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(log_level))
        .boxed();
    let mut layers: Vec<BoxedLayer> = vec![console_layer];

    let file_guard = if config.local_enabled {
        let (file_layer, guard) = file_layer(config, env_filter(log_level))?;
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry().with(layers).init();

    tracing::info!(
        level = %log_level,
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        local_rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

// EnvFilter is not Clone, each layer gets its own
fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("directory_sync={level}")))
}

fn file_layer(config: &LoggingConfig, filter: EnvFilter) -> Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation_for(&config.local_rotation),
        &config.local_path,
        LOG_FILE_NAME,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer)
        .with_filter(filter)
        .boxed();

    Ok((layer, guard))
}

fn rotation_for(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        _ => Rotation::DAILY,
    }
}

/// Parse log level from string
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(SyncError::Configuration(format!(
            "Invalid log level: {level_str}. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level_valid() {
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("warn").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("error").unwrap(), Level::ERROR);
    }

    #[test]
    fn test_parse_log_level_case_insensitive() {
        assert_eq!(parse_log_level("TRACE").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("Debug").unwrap(), Level::DEBUG);
    }

    #[test]
    fn test_parse_log_level_invalid() {
        assert!(parse_log_level("invalid").is_err());
        assert!(parse_log_level("").is_err());
    }

    #[test]
    fn test_rotation_for() {
        assert_eq!(rotation_for("hourly"), Rotation::HOURLY);
        assert_eq!(rotation_for("daily"), Rotation::DAILY);
    }

    #[test]
    fn test_init_logging_rejects_bad_level() {
        let config = LoggingConfig {
            local_enabled: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging("verbose", &config).is_err());
    }
}
