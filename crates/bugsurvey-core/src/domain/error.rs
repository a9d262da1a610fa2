//! Error taxonomy for the survey core.

use bugsurvey_state::{Label, StorageError};

/// Boundary rejections of an inbound response submission.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("participant id must not be empty")]
    EmptyParticipantId,

    #[error("participant id contains illegal characters: {id:?}")]
    IllegalParticipantId { id: String },

    #[error("item id must not be empty")]
    EmptyItemId,

    #[error("unknown label for {field}: {value:?}")]
    UnknownLabel { field: &'static str, value: String },

    #[error("latency must be a non-negative number of milliseconds, got {latency_ms}")]
    InvalidLatency { latency_ms: f64 },

    #[error("item {item} is {expected} in the corpus, submission says {submitted}")]
    LabelMismatch {
        item: String,
        expected: Label,
        submitted: Label,
    },
}

/// Unreadable or invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Survey core errors.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for survey core operations.
pub type Result<T> = std::result::Result<T, SurveyError>;
