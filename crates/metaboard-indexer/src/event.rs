//! Inbound events and per-event reports.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use metaboard_core::{Address, Hash32, HashSource, MetaId, MetaOutcome, Subject};
use metaboard_store::InsertResult;

/// A `MetaV1` submission emitted by an origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaV1Event {
    /// The emitting contract. Selects the Board.
    pub origin_address: Address,
    /// The account that submitted the document.
    pub sender: Address,
    /// What the document is about.
    pub subject: Subject,
    /// The submitted bytes, verbatim.
    pub meta: Bytes,
    /// Block the event was emitted in, when the host knows it.
    pub block_number: Option<u64>,
}

impl MetaV1Event {
    /// Block used for journaling; events without one are journaled at 0.
    pub fn journal_block(&self) -> u64 {
        self.block_number.unwrap_or(0)
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Terminal state of the decode pipeline.
    pub outcome: MetaOutcome,
    /// The Meta written, or `None` when the event was skipped.
    pub meta_id: Option<MetaId>,
    /// `None` when skipped, otherwise whether the Meta was new.
    pub insert: Option<InsertResult>,
    /// The board counter after the event.
    pub sequence_counter: u64,
    pub content_hash: Hash32,
    pub hash_source: HashSource,
}

impl IngestReport {
    /// Whether decoded content was attached to the Meta.
    pub fn has_content(&self) -> bool {
        self.outcome.has_content() && self.meta_id.is_some()
    }
}
