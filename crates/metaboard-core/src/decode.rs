//! Structured decoding of a document body.
//!
//! CBOR parsing itself is delegated to `ciborium`. This module reads the body
//! as a CBOR sequence and classifies the result:
//! - a single map is an [`ValueTree::Object`]
//! - a single array, or more than one top-level item, is a [`ValueTree::Sequence`]
//! - any other single item is a [`ValueTree::Scalar`]
//!
//! Once a sequence reaches [`MAX_SEQUENCE_ITEMS`] the rest of the body is left
//! unread; the shape is already known. Malformed input is a [`DecodeError`], never a panic.

use ciborium::value::Value;

use crate::error::{CoreError, DecodeError};

/// Maximum number of top-level items read from one CBOR sequence.
pub const MAX_SEQUENCE_ITEMS: usize = 64;

/// A decoded document body.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTree {
    /// Map entries in encoded order.
    Object(Vec<(Value, Value)>),
    /// Array items, or the items of a multi-item CBOR sequence.
    Sequence(Vec<Value>),
    /// Any other single value.
    Scalar(Value),
}

impl ValueTree {
    /// Classify a single decoded value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Map(entries) => ValueTree::Object(entries),
            Value::Array(items) => ValueTree::Sequence(items),
            other => ValueTree::Scalar(other),
        }
    }

    /// Short name of the shape, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ValueTree::Object(_) => "object",
            ValueTree::Sequence(_) => "sequence",
            ValueTree::Scalar(_) => "scalar",
        }
    }
}

/// Decode a document body.
pub fn decode(bytes: &[u8]) -> Result<ValueTree, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut reader = bytes;
    let mut items = Vec::new();
    while !reader.is_empty() && items.len() < MAX_SEQUENCE_ITEMS {
        let value: Value = ciborium::from_reader(&mut reader)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        items.push(value);
    }

    if items.len() == 1 {
        // Length checked above
        Ok(ValueTree::from_value(items.remove(0)))
    } else {
        Ok(ValueTree::Sequence(items))
    }
}

/// Encode a value to CBOR bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok(buf)
}
