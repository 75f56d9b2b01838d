//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use metaboard_core::{wrap_envelope, Address, ContentMeta, Hash32, KnownMagic, MagicNumber, Subject};
use metaboard_indexer::MetaV1Event;

/// Generate a random Address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a random 256-bit Subject.
pub fn subject() -> impl Strategy<Value = Subject> {
    any::<[u8; 32]>().prop_map(Subject::from_be_bytes)
}

/// Generate a random Hash32.
pub fn hash32() -> impl Strategy<Value = Hash32> {
    any::<[u8; 32]>().prop_map(Hash32::from_bytes)
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a non-empty payload as it appears in a document: hex text,
/// either case, with or without the `h'..'` wrapper.
pub fn hex_payload_text() -> impl Strategy<Value = (Vec<u8>, String)> {
    (prop::collection::vec(any::<u8>(), 1..=64), any::<bool>(), any::<bool>()).prop_map(
        |(bytes, upper, wrapped)| {
            let mut hex_text = hex::encode(&bytes);
            if upper {
                hex_text = hex_text.to_uppercase();
            }
            let text = if wrapped {
                format!("h'{hex_text}'")
            } else {
                hex_text
            };
            (bytes, text)
        },
    )
}

/// Generate a magic number that fits in 64 bits, often a registered one.
pub fn magic_number() -> impl Strategy<Value = MagicNumber> {
    prop_oneof![
        any::<u64>().prop_map(MagicNumber::from),
        prop::sample::select(KnownMagic::ALL.to_vec()).prop_map(MagicNumber::from),
    ]
}

/// Generate a magic number of up to 24 big-endian bytes.
pub fn wide_magic_number() -> impl Strategy<Value = MagicNumber> {
    prop::collection::vec(any::<u8>(), 1..=24).prop_map(|b| MagicNumber::from_be_bytes(&b))
}

/// Generate a magic number wider than 64 bits, up to 128 bits. Documents
/// carry these as tag-2 bignums.
pub fn bignum_magic_number() -> impl Strategy<Value = MagicNumber> {
    (1u8..=255, prop::collection::vec(any::<u8>(), 8..=15)).prop_map(|(lead, rest)| {
        let mut bytes = vec![lead];
        bytes.extend(rest);
        MagicNumber::from_be_bytes(&bytes)
    })
}

/// Generate an optional content descriptor string.
pub fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z][a-z0-9/+.-]{0,23}".prop_map(String::from))
}

/// Parameters for generating content.
#[derive(Debug, Clone)]
pub struct ContentParams {
    pub payload: Vec<u8>,
    pub magic_number: MagicNumber,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
}

impl Arbitrary for ContentParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(any::<u8>(), 1..=256),
            magic_number(),
            optional_text(),
            optional_text(),
            optional_text(),
        )
            .prop_map(|(payload, magic_number, ty, enc, lang)| ContentParams {
                payload,
                magic_number,
                content_type: ty,
                content_encoding: enc,
                content_language: lang,
            })
            .boxed()
    }
}

/// Build content from parameters.
pub fn content_from_params(params: &ContentParams) -> ContentMeta {
    ContentMeta {
        payload: Bytes::from(params.payload.clone()),
        magic_number: params.magic_number.clone(),
        content_type: params.content_type.clone(),
        content_encoding: params.content_encoding.clone(),
        content_language: params.content_language.clone(),
    }
}

/// Generate a raw event payload: arbitrary bytes, or the prefix followed by
/// arbitrary bytes.
pub fn raw_payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        payload(128),
        payload(128).prop_map(|body| wrap_envelope(&body)),
    ]
}

/// Generate `len` events from `origins` with non-decreasing block numbers.
///
/// Payloads mix valid documents, prefixed garbage and plain bytes.
pub fn event_stream(
    origins: Vec<Address>,
    len: std::ops::Range<usize>,
) -> impl Strategy<Value = Vec<MetaV1Event>> {
    let item = (
        prop::sample::select(origins),
        address(),
        0u64..3,
        prop_oneof![
            any::<ContentParams>().prop_map(|p| content_from_params(&p)
                .to_document()
                .unwrap_or_default()),
            raw_payload(),
        ],
    );
    prop::collection::vec(item, len).prop_map(|items| {
        let mut block = 1;
        items
            .into_iter()
            .map(|(origin, sender, step, meta)| {
                block += step;
                MetaV1Event {
                    origin_address: origin,
                    sender,
                    subject: Subject::from(block),
                    meta: Bytes::from(meta),
                    block_number: Some(block),
                }
            })
            .collect()
    })
}
