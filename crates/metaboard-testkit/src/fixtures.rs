//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use async_trait::async_trait;
use bytes::Bytes;

use metaboard_core::decode::encode;
use metaboard_core::{wrap_envelope, Address, ContentMeta, Subject, Value};
use metaboard_indexer::{HashCallError, Indexer, IndexerConfig, MetaV1Event, OriginHasher};
use metaboard_store::{MemoryStore, StoreConfig};

/// A test fixture: one origin, one sender, and event builders for them.
#[derive(Debug, Clone)]
pub struct TestFixture {
    pub origin: Address,
    pub sender: Address,
    pub subject: Subject,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_seed(0x0a)
    }

    /// Deterministic addresses derived from `seed`.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            origin: Address::from_bytes([seed; 20]),
            sender: Address::from_bytes([seed.wrapping_add(0x50); 20]),
            subject: Subject::from(u64::from(seed)),
        }
    }

    /// An event carrying `meta` verbatim.
    pub fn event(&self, meta: impl Into<Bytes>, block: Option<u64>) -> MetaV1Event {
        MetaV1Event {
            origin_address: self.origin,
            sender: self.sender,
            subject: self.subject,
            meta: meta.into(),
            block_number: block,
        }
    }

    /// An event carrying a complete, valid meta document for `content`.
    pub fn content_event(&self, content: &ContentMeta, block: Option<u64>) -> MetaV1Event {
        let doc = content
            .to_document()
            .expect("content documents always encode");
        self.event(doc, block)
    }

    /// An event whose payload is the prefix followed by `value` as CBOR.
    pub fn value_event(&self, value: &Value, block: Option<u64>) -> MetaV1Event {
        self.event(document(value), block)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures for distinct origins.
pub fn multi_origin_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_seed(i as u8 + 1))
        .collect()
}

/// Prefix + CBOR encoding of `value`.
pub fn document(value: &Value) -> Vec<u8> {
    wrap_envelope(&encode(value).expect("values always encode"))
}

/// A content object with integer keys, from `(key, value)` pairs.
pub fn object(entries: Vec<(u64, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::Integer(k.into()), v))
            .collect(),
    )
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

/// An in-memory indexer with the given store and indexer settings.
pub fn memory_indexer(store: StoreConfig, config: IndexerConfig) -> Indexer<MemoryStore> {
    Indexer::new(MemoryStore::new(store), config).expect("fixture config is valid")
}

/// Origin hasher that always answers with the same digest.
pub struct StaticHasher(pub [u8; 32]);

#[async_trait]
impl OriginHasher for StaticHasher {
    async fn hash(&self, _origin: &Address, _data: &[u8]) -> Result<[u8; 32], HashCallError> {
        Ok(self.0)
    }
}

/// Origin hasher whose call always reverts.
pub struct RevertingHasher(pub &'static str);

#[async_trait]
impl OriginHasher for RevertingHasher {
    async fn hash(&self, _origin: &Address, _data: &[u8]) -> Result<[u8; 32], HashCallError> {
        Err(HashCallError::Reverted(self.0.to_string()))
    }
}
