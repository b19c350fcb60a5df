/// Structured logging for the air-quality service
///
/// Installs a `tracing` subscriber with console output and optional
/// file-based logging, and provides failure classification so that an
/// offline dataset is reported differently from a broken one.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::model::AirError;

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level; `RUST_LOG` takes precedence when set.
    pub level: Level,
    /// Optional file the log is appended to (no ANSI colors).
    pub log_file: Option<PathBuf>,
    /// Whether to include timestamps in console output.
    pub console_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_file: None,
            console_timestamps: false,
        }
    }
}

impl LogConfig {
    /// 0 → info, 1 → debug, 2+ → trace.
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Initialize the global subscriber. Calling it twice is a no-op.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_ascii_lowercase()));

    let console_with_time = config
        .console_timestamps
        .then(|| tfmt::layer().with_target(false).with_writer(io::stderr));
    let console_plain = (!config.console_timestamps).then(|| {
        tfmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(io::stderr)
    });

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(tfmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_with_time)
        .with(console_plain)
        .with(file_layer)
        .try_init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - resource withdrawn or not yet published
    Expected,
    /// Unexpected failure - portal degradation, schema change or local bug
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a dataset failure from the error that caused it.
///
/// The city portal answers 404/410 when a resource is rotated to a new
/// URL (yearly extracts are republished), which is routine. Server errors,
/// timeouts and undecodable payloads point at something actually broken.
pub fn classify_failure(err: &AirError) -> FailureType {
    match err {
        AirError::HttpError { status, .. } if matches!(status, 404 | 410) => FailureType::Expected,
        AirError::HttpError { status, .. } if *status >= 500 => FailureType::Unexpected,
        AirError::HttpError { .. } => FailureType::Unknown,
        AirError::Request(e) if e.is_timeout() || e.is_connect() => FailureType::Unexpected,
        AirError::Json(_) | AirError::Csv(_) | AirError::UnsupportedLayout(_) => {
            FailureType::Unexpected
        }
        AirError::EmptyDataset(_) => FailureType::Unknown,
        _ => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a dataset failure with automatic classification
pub fn log_source_failure(dataset: &str, operation: &str, err: &AirError) {
    let failure_type = classify_failure(err);
    match failure_type {
        FailureType::Expected => {
            debug!(dataset, failure = %failure_type, "{} failed: {}", operation, err)
        }
        FailureType::Unexpected => {
            error!(dataset, failure = %failure_type, "{} failed: {}", operation, err)
        }
        FailureType::Unknown => {
            warn!(dataset, failure = %failure_type, "{} failed: {}", operation, err)
        }
    }
}

// ---------------------------------------------------------------------------
// Ingest Summary Logging
// ---------------------------------------------------------------------------

/// Log how many raw rows survived normalization for one dataset.
pub fn log_ingest_summary(dataset: &str, total: usize, kept: usize, dropped: usize) {
    if kept == 0 && total > 0 {
        error!(dataset, total, kept, dropped, "no valid records after normalization");
    } else if dropped > 0 {
        warn!(dataset, total, kept, dropped, "valid records: {}/{}", kept, total);
    } else {
        info!(dataset, total, kept, "valid records: {}/{}", kept, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_maps_to_levels() {
        assert_eq!(LogConfig::from_verbosity(0).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(1).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(5).level, Level::TRACE);
    }

    #[test]
    fn test_failure_classification() {
        let gone = AirError::HttpError {
            url: "https://dati.comune.milano.it/x.json".to_string(),
            status: 404,
        };
        assert_eq!(classify_failure(&gone), FailureType::Expected);

        let broken = AirError::HttpError {
            url: "https://dati.comune.milano.it/x.json".to_string(),
            status: 503,
        };
        assert_eq!(classify_failure(&broken), FailureType::Unexpected);

        let layout = AirError::UnsupportedLayout("scalar".to_string());
        assert_eq!(classify_failure(&layout), FailureType::Unexpected);

        let empty = AirError::EmptyDataset("ds573".to_string());
        assert_eq!(classify_failure(&empty), FailureType::Unknown);
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let config = LogConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
