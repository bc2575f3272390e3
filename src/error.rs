//! Error types for the classification core.
//!
//! Adapter failures are always absorbed by the pipeline; only `ClassifyError`
//! reaches callers of `classify_report`.

use thiserror::Error;

/// Why the external analysis source could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterFailure {
    /// No credential/endpoint configured. Expected startup state.
    #[error("analysis adapter not configured: {0}")]
    Configuration(String),

    /// Network error, timeout, or non-success HTTP status.
    #[error("analysis transport failure: {0}")]
    Transport(String),

    /// The endpoint answered but the payload could not be interpreted.
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

impl AdapterFailure {
    /// Short label for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterFailure::Configuration(_) => "configuration",
            AdapterFailure::Transport(_) => "transport",
            AdapterFailure::Malformed(_) => "malformed",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterFailure::Transport(_))
    }
}

impl From<reqwest::Error> for AdapterFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AdapterFailure::Malformed(e.to_string())
        } else {
            AdapterFailure::Transport(e.to_string())
        }
    }
}

/// Errors surfaced to callers of the pipeline (caller misuse only).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("report description is empty")]
    EmptyDescription,
}

/// Errors from the report intake workflow.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid coordinates: longitude {longitude}, latitude {latitude}")]
    InvalidCoordinates { longitude: f64, latitude: f64 },

    #[error(transparent)]
    Classification(#[from] ClassifyError),

    #[error("report store error: {0:#}")]
    Store(#[from] anyhow::Error),
}
