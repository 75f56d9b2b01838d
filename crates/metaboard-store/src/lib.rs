//! # MetaBoard Store
//!
//! Aggregate persistence for the MetaBoard indexer. Provides a trait-based
//! interface for boards and metas with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The [`Store`] trait keeps the indexer storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`IdScheme`] - How meta ids are assigned
//! - [`CommitOutcome`] - Result of committing one event
//! - [`RevertReport`] - What a rollback undid
//!
//! ## Usage
//!
//! ```rust,no_run
//! use metaboard_store::{SqliteStore, Store, StoreConfig};
//! use metaboard_core::Address;
//!
//! async fn example() -> metaboard_store::Result<()> {
//!     let store = SqliteStore::open("metaboard.db", StoreConfig::default())?;
//!
//!     let origin = Address::from_bytes([0x11; 20]);
//!     let board = store.get_or_create_board(&origin, 1).await?;
//!     assert_eq!(board.sequence_counter, 0);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Sequence ids**: a duplicate `(board, seq)` is an integrity violation
//! - **Content ids**: re-submitting identical content returns `AlreadyExists`
//! - **Atomic commit**: meta creation and counter advance succeed or fail together
//! - **Rollback**: writes are journaled by block and can be reverted until finalized

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    Change, CommitOutcome, IdScheme, InsertResult, RevertReport, Store, StoreConfig, StoreExt,
};
