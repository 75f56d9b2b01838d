//! Meta content schema (v1) validation.
//!
//! A meta content object is a CBOR map with positional keys. A key matches
//! either the CBOR integer `n` or the text `"n"`.
//!
//! | key | field            | kind                        | required |
//! |-----|------------------|-----------------------------|----------|
//! | 0   | payload          | text, hex, optional `h'..'` | yes      |
//! | 1   | magic number     | unsigned integer            | yes      |
//! | 2   | content type     | text                        | no       |
//! | 3   | content encoding | text                        | no       |
//! | 4   | content language | text                        | no       |

use ciborium::value::Value;

use crate::content::MagicNumber;
use crate::error::SchemaError;

/// Positional field keys.
pub mod keys {
    pub const PAYLOAD: u64 = 0;
    pub const MAGIC_NUMBER: u64 = 1;
    pub const CONTENT_TYPE: u64 = 2;
    pub const CONTENT_ENCODING: u64 = 3;
    pub const CONTENT_LANGUAGE: u64 = 4;
}

/// The optional text fields, in canonical order.
pub const OPTIONAL_TEXT_FIELDS: [(u64, &str); 3] = [
    (keys::CONTENT_TYPE, "content type"),
    (keys::CONTENT_ENCODING, "content encoding"),
    (keys::CONTENT_LANGUAGE, "content language"),
];

/// Look up a positional field. The first matching entry wins.
pub fn field(object: &[(Value, Value)], key: u64) -> Option<&Value> {
    object
        .iter()
        .find(|(k, _)| key_matches(k, key))
        .map(|(_, v)| v)
}

fn key_matches(candidate: &Value, key: u64) -> bool {
    match candidate {
        Value::Integer(i) => i128::from(*i) == i128::from(key),
        Value::Text(s) => s.parse::<u64>().map_or(false, |n| n == key && s == &n.to_string()),
        _ => false,
    }
}

/// Strip an `h'...'` byte-string wrapper.
///
/// A leading `h'` and a trailing `'` are each removed if present. If the
/// remainder still contains a quote the input is returned unchanged, so
/// stripping is idempotent and quoted garbage never turns into hex.
pub fn strip_hex_wrapper(s: &str) -> &str {
    let inner = s.strip_prefix("h'").unwrap_or(s);
    let inner = inner.strip_suffix('\'').unwrap_or(inner);
    if inner.contains('\'') {
        s
    } else {
        inner
    }
}

/// Wrap hex text as `h'...'`.
pub fn wrap_hex(hex_text: &str) -> String {
    format!("h'{}'", hex_text)
}

/// Non-empty and every character in `[0-9A-Fa-f]`.
pub fn is_hexadecimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate a decoded object against the meta content schema.
pub fn validate_content(object: &[(Value, Value)]) -> Result<(), SchemaError> {
    // 1. Payload: mandatory hex text
    let payload = match field(object, keys::PAYLOAD) {
        Some(Value::Text(s)) => s,
        Some(_) => return Err(SchemaError::PayloadNotText),
        None => return Err(SchemaError::MissingPayload),
    };
    let unwrapped = strip_hex_wrapper(payload);
    if !is_hexadecimal(unwrapped) {
        return Err(SchemaError::PayloadNotHex(payload.clone()));
    }

    // 2. Magic number: mandatory unsigned integer
    match field(object, keys::MAGIC_NUMBER) {
        Some(value) => {
            if MagicNumber::from_value(value).is_none() {
                return Err(SchemaError::MagicNumberNotUnsigned);
            }
        }
        None => return Err(SchemaError::MissingMagicNumber),
    }

    // 3. Optional fields must be text when present
    for (key, name) in OPTIONAL_TEXT_FIELDS {
        match field(object, key) {
            None | Some(Value::Text(_)) => {}
            Some(_) => return Err(SchemaError::OptionalNotText { key, name }),
        }
    }

    Ok(())
}

/// Boolean form of [`validate_content`].
pub fn is_valid_content(object: &[(Value, Value)]) -> bool {
    validate_content(object).is_ok()
}
