//! Error types for bugsurvey-state

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by event log backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing store failed
    #[error("event log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A participant id cannot be used as a storage key
    #[error("invalid storage key: {key:?}")]
    InvalidKey { key: String },
}

/// Errors raised while loading the item corpus.
///
/// Callers of [`crate::CorpusSource::load_pools`] never see these; the pool is
/// replaced by an empty one and the error is logged.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus file does not exist
    #[error("corpus file not found: {}", path.display())]
    Missing { path: PathBuf },

    /// Corpus file exists but could not be read
    #[error("failed to read corpus file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
