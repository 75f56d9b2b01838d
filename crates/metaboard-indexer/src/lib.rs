//! # MetaBoard Indexer
//!
//! Turns `MetaV1` events into Board and Meta records.
//!
//! ## Overview
//!
//! Every event is attributed to the Board of its origin, run through the
//! decode pipeline and persisted as exactly one Meta (unless configured to
//! skip events without content). Malformed payloads are recorded, never
//! rejected: the only errors are store failures.
//!
//! ```text
//! event ─► board ─► envelope ─► decode ─► validate ─► materialize ─► commit
//!                      │           │          │             │
//!                      └───────────┴──────────┴─────────────┴─► bare Meta
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use metaboard_indexer::{Indexer, IndexerConfig, MetaV1Event};
//! use metaboard_indexer::core::{Address, Subject};
//!
//! async fn example() -> metaboard_indexer::Result<()> {
//!     let indexer = Indexer::open(IndexerConfig::default())?;
//!
//!     let report = indexer
//!         .handle_event(&MetaV1Event {
//!             origin_address: Address::from_bytes([0x11; 20]),
//!             sender: Address::from_bytes([0x22; 20]),
//!             subject: Subject::from(1u64),
//!             meta: Bytes::from_static(b"not a document"),
//!             block_number: Some(100),
//!         })
//!         .await?;
//!     assert_eq!(report.sequence_counter, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `metaboard_indexer::core` - Primitives (Address, ContentMeta, decode, ...)
//! - `metaboard_indexer::store` - Storage abstraction and SQLite

pub mod config;
pub mod error;
pub mod event;
pub mod hasher;
pub mod indexer;
pub mod pipeline;

pub use config::{IndexerConfig, NonContentPolicy};
pub use error::{IndexerError, Result};
pub use event::{IngestReport, MetaV1Event};
pub use hasher::{resolve_content_hash, HashCallError, OriginHasher};
pub use indexer::Indexer;
pub use pipeline::{classify, Classification};

// Re-export component crates
pub use metaboard_core as core;
pub use metaboard_store as store;

// Re-export commonly used types
pub use metaboard_core::{Address, Board, ContentMeta, Hash32, Meta, MetaId, MetaOutcome, Subject};
pub use metaboard_store::{IdScheme, MemoryStore, SqliteStore, Store, StoreConfig};
