//! Error types for the store module.

use metaboard_core::{Address, CoreError, MetaId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A sequence-scoped meta id was assigned twice. The board counter and
    /// the stored metas disagree, so the event cannot be applied.
    #[error("duplicate meta id {0}")]
    DuplicateMeta(MetaId),

    /// A meta was committed for a board that was never resolved.
    #[error("board not found: {0}")]
    BoardNotFound(Address),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Stored identifiers or enums failed to parse.
    #[error("corrupt record: {0}")]
    Corrupt(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The blocking task running a SQLite operation failed.
    #[error("storage task failed: {0}")]
    Task(String),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether this error means the store's integrity invariant was violated.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, StoreError::DuplicateMeta(_) | StoreError::BoardNotFound(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use metaboard_core::Hash32;

    #[test]
    fn test_integrity_violations() {
        let fatal = [
            StoreError::DuplicateMeta(MetaId::Hash(Hash32::ZERO)),
            StoreError::BoardNotFound(Address::ZERO),
        ];
        assert!(fatal.iter().all(StoreError::is_integrity_violation));

        let recoverable = [
            StoreError::InvalidData("bad row".into()),
            StoreError::Migration("too new".into()),
            StoreError::Task("cancelled".into()),
            StoreError::Poisoned,
        ];
        assert!(!recoverable.iter().any(StoreError::is_integrity_violation));
    }
}
