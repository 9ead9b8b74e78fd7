//! Scheduling error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::traits::{ProviderError, RepositoryError};
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum RecurrenceError {
    #[error("invalid rule: {}", summarize(.0))]
    InvalidRule(Vec<ValidationError>),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("scheduling conflict: {0}")]
    Conflict(String),

    #[error("stale execution: {attempted} is not after the recorded {current}")]
    StaleExecution {
        attempted: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("calendar error: {0}")]
    Calendar(#[from] ProviderError),
}

/// Compact one-line rendering of a validation failure list.
fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
