//! Error types for the indexer.

use metaboard_store::StoreError;
use thiserror::Error;

/// Errors that stop an event from being applied.
///
/// Decode, schema and hash-call failures never appear here: they are
/// recorded on the Meta as its outcome or hash source.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Storage error, including duplicate sequence ids.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Whether the store's integrity invariant was violated.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, IndexerError::Store(e) if e.is_integrity_violation())
    }
}

/// Result type for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;
