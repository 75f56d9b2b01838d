//! Envelope, decode, validate, materialize: steps 2 to 5 of event handling.
//!
//! Pure and synchronous. Every input maps to exactly one terminal
//! [`MetaOutcome`]; nothing here is fatal.

use metaboard_core::{
    decode, strip_envelope, validate_content, ContentMeta, MetaOutcome, ValueTree,
};

/// Result of running a raw payload through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: MetaOutcome,
    /// Present exactly when `outcome` is `ContentMaterialized`.
    pub content: Option<ContentMeta>,
    /// Why content was not produced, for logs.
    pub detail: Option<String>,
}

impl Classification {
    fn without_content(outcome: MetaOutcome, detail: impl Into<String>) -> Self {
        Self {
            outcome,
            content: None,
            detail: Some(detail.into()),
        }
    }
}

/// Classify a raw event payload.
pub fn classify(raw: &[u8]) -> Classification {
    let Some(body) = strip_envelope(raw) else {
        return Classification::without_content(MetaOutcome::NoContent, "no meta document prefix");
    };

    let object = match decode(body) {
        Ok(ValueTree::Object(entries)) => entries,
        Ok(other) => {
            return Classification::without_content(
                MetaOutcome::UnsupportedShape,
                format!("decoded to a {}", other.kind()),
            )
        }
        Err(e) => return Classification::without_content(MetaOutcome::DecodeError, e.to_string()),
    };
    tracing::trace!(entries = object.len(), "decoded meta object");

    if let Err(e) = validate_content(&object) {
        return Classification::without_content(MetaOutcome::InvalidContent, e.to_string());
    }

    match ContentMeta::materialize(&object) {
        Ok(content) => Classification {
            outcome: MetaOutcome::ContentMaterialized,
            content: Some(content),
            detail: None,
        },
        Err(e) => Classification::without_content(MetaOutcome::InvalidContent, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metaboard_core::decode::encode;
    use metaboard_core::{wrap_envelope, KnownMagic, Value};

    fn document(value: Value) -> Vec<u8> {
        wrap_envelope(&encode(&value).unwrap())
    }

    fn int(n: u64) -> Value {
        Value::Integer(n.into())
    }

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    #[test]
    fn test_valid_document() {
        let raw = document(Value::Map(vec![(int(0), text("h'aa'")), (int(1), int(42))]));
        let c = classify(&raw);
        assert_eq!(c.outcome, MetaOutcome::ContentMaterialized);
        let content = c.content.unwrap();
        assert_eq!(content.payload.as_ref(), &[0xaa]);
        assert_eq!(content.magic_number.to_u64(), Some(42));
        assert!(content.content_type.is_none());
        assert!(c.detail.is_none());
    }

    #[test]
    fn test_no_prefix() {
        let c = classify(b"plain bytes");
        assert_eq!(c.outcome, MetaOutcome::NoContent);
        assert!(c.content.is_none());
    }

    #[test]
    fn test_prefix_only_is_decode_error() {
        let c = classify(&wrap_envelope(&[]));
        assert_eq!(c.outcome, MetaOutcome::DecodeError);
    }

    #[test]
    fn test_garbage_after_prefix() {
        let c = classify(&wrap_envelope(&[0xff, 0xff, 0x1c]));
        assert_eq!(c.outcome, MetaOutcome::DecodeError);
    }

    #[test]
    fn test_sequence_and_scalar_are_unsupported() {
        let c = classify(&document(Value::Array(vec![int(1), int(2)])));
        assert_eq!(c.outcome, MetaOutcome::UnsupportedShape);

        let c = classify(&document(text("h'aa'")));
        assert_eq!(c.outcome, MetaOutcome::UnsupportedShape);
    }

    #[test]
    fn test_long_cbor_sequence_is_unsupported() {
        let c = classify(&wrap_envelope(&[0x00; 65]));
        assert_eq!(c.outcome, MetaOutcome::UnsupportedShape);
        assert!(c.content.is_none());
    }

    #[test]
    fn test_missing_magic_number() {
        let c = classify(&document(Value::Map(vec![(int(0), text("h'aa'"))])));
        assert_eq!(c.outcome, MetaOutcome::InvalidContent);
        assert!(c.detail.unwrap().contains("magic number"));
    }

    #[test]
    fn test_odd_length_hex_fails_closed() {
        let c = classify(&document(Value::Map(vec![
            (int(0), text("h'abc'")),
            (int(1), int(KnownMagic::RainlangV1.to_u64())),
        ])));
        assert_eq!(c.outcome, MetaOutcome::InvalidContent);
        assert!(c.content.is_none());
    }

    #[test]
    fn test_optional_field_wrong_type() {
        let c = classify(&document(Value::Map(vec![
            (int(0), text("h'aa'")),
            (int(1), int(1)),
            (int(2), int(5)),
        ])));
        assert_eq!(c.outcome, MetaOutcome::InvalidContent);
    }
}
