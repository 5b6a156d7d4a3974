//! Unified error hierarchy for PulseCoach
//!
//! Provides the error types raised by record stores, ingestion validation and
//! the simulation layer, with severity mapping for the tracing system.
//!
//! Trend aggregation and recommendation generation are pure and have no error
//! path: an empty window is a defined all-zero output, not a failure.

use std::path::PathBuf;
use thiserror::Error;

use crate::recovery::RecordValidationError;

/// Top-level error type for all PulseCoach operations
#[derive(Debug, Error)]
pub enum PulseCoachError {
    /// Record rejected at the ingestion boundary
    #[error("Validation error: {0}")]
    Validation(#[from] RecordValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file present but unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A delayed task panicked or was aborted
    #[error("Simulation error: {0}")]
    Simulation(String),
}

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record for this day and source already exists
    #[error("Duplicate entry: {kind} for {date} from {source_name}")]
    Duplicate {
        kind: String,
        date: String,
        source_name: String,
    },

    /// Persisted collection could not be read or decoded
    #[error("Corrupted collection {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Persisted collection could not be written
    #[error("Write failed to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// Lock poisoned by a panicking writer
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type alias for PulseCoach operations
pub type Result<T> = std::result::Result<T, PulseCoachError>;

impl PulseCoachError {
    /// Transient IO failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PulseCoachError::Io(_) | PulseCoachError::Store(StoreError::WriteFailed { .. })
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PulseCoachError::Validation(_) => ErrorSeverity::Warning,
            PulseCoachError::Store(StoreError::Duplicate { .. }) => ErrorSeverity::Warning,
            PulseCoachError::Simulation(_) => ErrorSeverity::Warning,
            PulseCoachError::Store(StoreError::Corrupted { .. }) => ErrorSeverity::Error,
            PulseCoachError::Store(StoreError::Poisoned(_)) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Message for the CLI, with a hint where one helps
    pub fn user_message(&self) -> String {
        match self {
            PulseCoachError::Validation(e) => {
                format!("The record was rejected: {}", e)
            }
            PulseCoachError::Store(StoreError::Duplicate {
                kind,
                date,
                source_name,
            }) => {
                format!(
                    "A {} record for {} from {} already exists.",
                    kind, date, source_name
                )
            }
            PulseCoachError::Store(StoreError::Corrupted { path, .. }) => {
                format!(
                    "Stored data at {} could not be read. Remove or repair the file and try again.",
                    path.display()
                )
            }
            _ => self.to_string(),
        }
    }
}

/// How loudly a failure should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Store state can no longer be trusted
    Critical,
    /// The command failed
    Error,
    /// Input was refused; nothing changed
    Warning,
}

impl ErrorSeverity {
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical | ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
