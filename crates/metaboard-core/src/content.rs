//! Content materialization: typed fields and the content identifier.

use bytes::Bytes;
use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Hash32;
use crate::decode::encode;
use crate::envelope::{wrap_envelope, KnownMagic};
use crate::error::{CoreError, SchemaError};
use crate::schema::{field, keys, strip_hex_wrapper, wrap_hex, OPTIONAL_TEXT_FIELDS};

/// CBOR tag for a positive bignum (RFC 8949 §3.4.3).
const TAG_POSITIVE_BIGNUM: u64 = 2;

/// An arbitrary-precision unsigned integer, kept as minimal big-endian bytes.
///
/// Zero is the single byte `00`; every other value has no leading zero byte.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MagicNumber(Vec<u8>);

impl MagicNumber {
    /// Build from big-endian bytes of any length.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let first = bytes.iter().position(|b| *b != 0);
        match first {
            Some(i) => Self(bytes[i..].to_vec()),
            None => Self(vec![0]),
        }
    }

    /// Extract from a decoded value: a non-negative integer or a tag-2 bignum.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => u128::try_from(*i).ok().map(Self::from),
            Value::Tag(TAG_POSITIVE_BIGNUM, inner) => match inner.as_ref() {
                Value::Bytes(b) => Some(Self::from_be_bytes(b)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Minimal big-endian bytes. This is the encoding hashed into content ids.
    pub fn as_be_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_u128(&self) -> Option<u128> {
        if self.0.len() > 16 {
            return None;
        }
        let mut buf = [0u8; 16];
        buf[16 - self.0.len()..].copy_from_slice(&self.0);
        Some(u128::from_be_bytes(buf))
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|v| u64::try_from(v).ok())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0]
    }

    /// The registered magic this number names, if any.
    pub fn known(&self) -> Option<KnownMagic> {
        self.to_u64().and_then(KnownMagic::from_u64)
    }

    /// Encode back to a CBOR value.
    pub fn to_value(&self) -> Value {
        match self.to_u64() {
            Some(v) => Value::Integer(v.into()),
            None => Value::Tag(TAG_POSITIVE_BIGNUM, Box::new(Value::Bytes(self.0.clone()))),
        }
    }
}

impl From<u128> for MagicNumber {
    fn from(value: u128) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }
}

impl From<u64> for MagicNumber {
    fn from(value: u64) -> Self {
        Self::from(u128::from(value))
    }
}

impl From<KnownMagic> for MagicNumber {
    fn from(magic: KnownMagic) -> Self {
        Self::from(magic.to_u64())
    }
}

impl fmt::Debug for MagicNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MagicNumber({})", self)
    }
}

impl fmt::Display for MagicNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// The decoded, typed content of a meta document.
///
/// `payload` and `magic_number` are the mandatory schema fields, so a
/// `ContentMeta` can never carry optional fields without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMeta {
    pub payload: Bytes,
    pub magic_number: MagicNumber,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
}

impl ContentMeta {
    /// Create content with only the mandatory fields.
    pub fn new(payload: impl Into<Bytes>, magic_number: impl Into<MagicNumber>) -> Self {
        Self {
            payload: payload.into(),
            magic_number: magic_number.into(),
            content_type: None,
            content_encoding: None,
            content_language: None,
        }
    }

    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    pub fn with_content_encoding(mut self, value: impl Into<String>) -> Self {
        self.content_encoding = Some(value.into());
        self
    }

    pub fn with_content_language(mut self, value: impl Into<String>) -> Self {
        self.content_language = Some(value.into());
        self
    }

    /// Convert a validated object into typed fields.
    ///
    /// Fails closed: anything that [`crate::schema::validate_content`] should
    /// have rejected, and payload hex that does not decode (odd length), is
    /// returned as an error.
    pub fn materialize(object: &[(Value, Value)]) -> Result<Self, SchemaError> {
        let payload_text = match field(object, keys::PAYLOAD) {
            Some(Value::Text(s)) => s,
            Some(_) => return Err(SchemaError::PayloadNotText),
            None => return Err(SchemaError::MissingPayload),
        };
        let unwrapped = strip_hex_wrapper(payload_text);
        if unwrapped.is_empty() {
            return Err(SchemaError::PayloadNotHex(payload_text.clone()));
        }
        let payload = hex::decode(unwrapped).map_err(|e| SchemaError::HexDecode(e.to_string()))?;

        let magic_number = match field(object, keys::MAGIC_NUMBER) {
            Some(value) => {
                MagicNumber::from_value(value).ok_or(SchemaError::MagicNumberNotUnsigned)?
            }
            None => return Err(SchemaError::MissingMagicNumber),
        };

        let mut optionals: [Option<String>; 3] = [None, None, None];
        for (slot, (key, name)) in optionals.iter_mut().zip(OPTIONAL_TEXT_FIELDS) {
            *slot = match field(object, key) {
                None => None,
                Some(Value::Text(s)) => Some(s.clone()),
                Some(_) => return Err(SchemaError::OptionalNotText { key, name }),
            };
        }
        let [content_type, content_encoding, content_language] = optionals;

        Ok(Self {
            payload: Bytes::from(payload),
            magic_number,
            content_type,
            content_encoding,
            content_language,
        })
    }

    /// The content identifier.
    ///
    /// `digest(payload ++ magic_number ++ content_type ++ content_encoding ++ content_language)`
    ///
    /// Absent strings contribute no bytes. The order is part of the external
    /// contract: changing it changes every derived id.
    pub fn content_id(&self) -> Hash32 {
        Hash32::digest_concat(&[
            &self.payload,
            self.magic_number.as_be_bytes(),
            self.content_type.as_deref().unwrap_or("").as_bytes(),
            self.content_encoding.as_deref().unwrap_or("").as_bytes(),
            self.content_language.as_deref().unwrap_or("").as_bytes(),
        ])
    }

    /// The payload as `h'..'` lowercase hex text.
    pub fn payload_hex_wrapped(&self) -> String {
        wrap_hex(&hex::encode(&self.payload))
    }

    /// Encode as a meta content object with integer keys.
    pub fn to_value(&self) -> Value {
        let mut entries = vec![
            (
                Value::Integer(keys::PAYLOAD.into()),
                Value::Text(self.payload_hex_wrapped()),
            ),
            (
                Value::Integer(keys::MAGIC_NUMBER.into()),
                self.magic_number.to_value(),
            ),
        ];
        let optionals = [
            &self.content_type,
            &self.content_encoding,
            &self.content_language,
        ];
        for ((key, _), value) in OPTIONAL_TEXT_FIELDS.into_iter().zip(optionals) {
            if let Some(s) = value {
                entries.push((Value::Integer(key.into()), Value::Text(s.clone())));
            }
        }
        Value::Map(entries)
    }

    /// Encode as a complete meta document: magic prefix followed by CBOR.
    pub fn to_document(&self) -> Result<Vec<u8>, CoreError> {
        Ok(wrap_envelope(&encode(&self.to_value())?))
    }
}
