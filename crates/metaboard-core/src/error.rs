//! Error types for the MetaBoard core.

use thiserror::Error;

/// Core errors for identifier parsing and encoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("malformed meta id key: {0}")]
    MalformedMetaId(String),

    #[error("unknown meta outcome: {0}")]
    UnknownOutcome(u8),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Structured decoding failed: the bytes after the envelope are not CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty document")]
    Empty,

    #[error("malformed cbor: {0}")]
    Malformed(String),
}

/// A decoded object does not satisfy the meta content schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing payload (key 0)")]
    MissingPayload,

    #[error("payload (key 0) is not a text string")]
    PayloadNotText,

    #[error("payload is not hexadecimal: {0:?}")]
    PayloadNotHex(String),

    #[error("missing magic number (key 1)")]
    MissingMagicNumber,

    #[error("magic number (key 1) is not an unsigned integer")]
    MagicNumberNotUnsigned,

    #[error("{name} (key {key}) is not a text string")]
    OptionalNotText { key: u64, name: &'static str },

    #[error("payload hex decode failed: {0}")]
    HexDecode(String),
}
