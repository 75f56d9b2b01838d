//! # MetaBoard Core
//!
//! Pure primitives for the MetaBoard indexer: envelope detection, structured
//! decoding, the meta content schema, and content identifiers.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! event payloads.
//!
//! ## Pipeline
//!
//! ```text
//! raw payload ─► envelope ─► decode ─► schema ─► content
//!                (prefix)    (CBOR)    (keys)    (typed fields + content id)
//! ```
//!
//! ## Key Types
//!
//! - [`Board`] / [`Meta`] - The two aggregates
//! - [`MetaId`] - Sequence-scoped or content-derived meta identifier
//! - [`ValueTree`] - Object / sequence / scalar classification of a decoded body
//! - [`ContentMeta`] - Typed content of a valid document
//! - [`Hash32`] - 32-byte digest (Keccak-256 locally)

pub mod content;
pub mod crypto;
pub mod decode;
pub mod envelope;
pub mod error;
pub mod model;
pub mod schema;
pub mod types;

pub use content::{ContentMeta, MagicNumber};
pub use crypto::Hash32;
pub use decode::{decode, ValueTree};
pub use envelope::{has_envelope, strip_envelope, wrap_envelope, KnownMagic, META_DOCUMENT_MAGIC};
pub use error::{CoreError, DecodeError, SchemaError};
pub use model::{Board, HashSource, Meta, MetaDraft, MetaOutcome};
pub use schema::{is_valid_content, strip_hex_wrapper, validate_content};
pub use types::{Address, MetaId, Subject};

/// Re-exported CBOR value type.
pub use ciborium::value::Value;
