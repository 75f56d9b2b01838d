//! Golden test vectors for content identifiers and documents.
//!
//! Any implementation of the content id must reproduce these digests.

use metaboard_core::{ContentMeta, Hash32, KnownMagic, MagicNumber};

/// A golden content id vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Payload bytes (hex).
    pub payload: &'static str,
    /// Magic number (hex, big-endian).
    pub magic_number: &'static str,
    pub content_type: Option<&'static str>,
    pub content_encoding: Option<&'static str>,
    pub content_language: Option<&'static str>,
    /// Expected content id (hex).
    pub expected_content_id: &'static str,
}

/// A complete raw document and the digest of its bytes.
#[derive(Debug, Clone)]
pub struct GoldenDocument {
    pub name: &'static str,
    /// Prefix + CBOR (hex).
    pub raw: &'static str,
    /// Expected local `content_hash` (hex).
    pub expected_digest: &'static str,
}

/// Get all golden content id vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "minimal",
            payload: "aa",
            magic_number: "2a",
            content_type: None,
            content_encoding: None,
            content_language: None,
            expected_content_id: "36b3a7e2826b8af9f6f6c5f74eabc9494ab1e06d96c8766a6234fc28e2f9bd77",
        },
        GoldenVector {
            name: "all optional fields",
            payload: "ff00",
            magic_number: "ff1c198cec3b48a7",
            content_type: Some("application/json"),
            content_encoding: Some("deflate"),
            content_language: Some("en"),
            expected_content_id: "c6d1d334ea8287c4a2d722cd8c1ca9c0464e35c363208ffce3d1d181023209f7",
        },
        GoldenVector {
            name: "zero magic number",
            payload: "deadbeef",
            magic_number: "00",
            content_type: Some("text/plain"),
            content_encoding: None,
            content_language: None,
            expected_content_id: "71df7221d564f59c328b884363111506550b36332088181c9a274a061e9b1977",
        },
        GoldenVector {
            name: "encoding without type",
            payload: "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20",
            magic_number: "ffe5282f43e495b4",
            content_type: None,
            content_encoding: Some("deflate"),
            content_language: None,
            expected_content_id: "02a46cce21efb83a92dcc2da34f492439720a1a600bf8ec5d042d16f67c4286b",
        },
    ]
}

/// Get all golden documents.
pub fn all_documents() -> Vec<GoldenDocument> {
    vec![GoldenDocument {
        name: "{0: \"h'aa'\", 1: 42}",
        raw: "ff0a89c674ee7874a20065682761612701182a",
        expected_digest: "71daf8fa6e7b161359f8afbccfa36d5f88fc4708bf2fd47f1e2f2eda7df86e1e",
    }]
}

/// Build the content a vector describes.
pub fn content_from_vector(vector: &GoldenVector) -> ContentMeta {
    let mut content = ContentMeta::new(
        hex::decode(vector.payload).unwrap_or_default(),
        MagicNumber::from_be_bytes(&hex::decode(vector.magic_number).unwrap_or_default()),
    );
    content.content_type = vector.content_type.map(String::from);
    content.content_encoding = vector.content_encoding.map(String::from);
    content.content_language = vector.content_language.map(String::from);
    content
}

/// Check every vector. Returns `(name, matches, computed hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let computed = content_from_vector(v).content_id().to_hex();
            (v.name.to_string(), computed == v.expected_content_id, computed)
        })
        .collect()
}

/// The registered magic a vector uses, if any.
pub fn vector_magic(vector: &GoldenVector) -> Option<KnownMagic> {
    content_from_vector(vector).magic_number.known()
}

/// Digest of a golden document's raw bytes.
pub fn document_digest(doc: &GoldenDocument) -> Hash32 {
    Hash32::digest(&hex::decode(doc.raw).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, computed) in verify_all_vectors() {
            assert!(matches, "vector '{name}' computed {computed}");
        }
    }

    #[test]
    fn test_vector_magic_numbers() {
        let vectors = all_vectors();
        assert_eq!(vector_magic(&vectors[0]), None);
        assert_eq!(vector_magic(&vectors[1]), Some(KnownMagic::RainlangV1));
        assert_eq!(vector_magic(&vectors[3]), Some(KnownMagic::OpMetaV1));
        assert!(content_from_vector(&vectors[2]).magic_number.is_zero());
    }

    #[test]
    fn test_document_digests() {
        for doc in all_documents() {
            assert_eq!(document_digest(&doc).to_hex(), doc.expected_digest, "{}", doc.name);
        }
    }

    #[test]
    fn test_document_encoding_is_stable() {
        let doc = &all_documents()[0];
        let content = ContentMeta::new(vec![0xaa], 42u64);
        assert_eq!(hex::encode(content.to_document().unwrap()), doc.raw);
    }
}
