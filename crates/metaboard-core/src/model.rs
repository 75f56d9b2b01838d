//! The two aggregates: [`Board`] and [`Meta`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::content::{ContentMeta, MagicNumber};
use crate::crypto::Hash32;
use crate::error::CoreError;
use crate::types::{Address, MetaId, Subject};

/// Per-origin registry of submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// The origin address.
    pub id: Address,
    /// Number of events processed for this origin. Also the next sequence id.
    pub sequence_counter: u64,
}

impl Board {
    /// A fresh board with a zero counter.
    pub fn new(id: Address) -> Self {
        Self {
            id,
            sequence_counter: 0,
        }
    }
}

/// Terminal state of the decode pipeline for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MetaOutcome {
    /// Envelope, decode and schema all succeeded.
    ContentMaterialized = 0,
    /// No magic prefix.
    NoContent = 1,
    /// Decoded to a sequence or scalar instead of an object.
    UnsupportedShape = 2,
    /// Body after the prefix is not valid CBOR.
    DecodeError = 3,
    /// Decoded object failed the content schema.
    InvalidContent = 4,
}

impl MetaOutcome {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self, CoreError> {
        match value {
            0 => Ok(Self::ContentMaterialized),
            1 => Ok(Self::NoContent),
            2 => Ok(Self::UnsupportedShape),
            3 => Ok(Self::DecodeError),
            4 => Ok(Self::InvalidContent),
            other => Err(CoreError::UnknownOutcome(other)),
        }
    }

    /// Whether decoded content is attached.
    pub fn has_content(self) -> bool {
        matches!(self, Self::ContentMaterialized)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContentMaterialized => "content-materialized",
            Self::NoContent => "no-content",
            Self::UnsupportedShape => "unsupported-shape",
            Self::DecodeError => "decode-error",
            Self::InvalidContent => "invalid-content",
        }
    }
}

/// Where a meta's `content_hash` came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashSource {
    /// Computed locally; no origin hasher configured.
    Local,
    /// Returned by the origin's own hash call.
    Origin,
    /// The origin call failed and the local digest was used instead.
    LocalFallback { reason: String },
}

impl HashSource {
    /// Storage discriminator.
    pub fn kind(&self) -> u8 {
        match self {
            HashSource::Local => 0,
            HashSource::Origin => 1,
            HashSource::LocalFallback { .. } => 2,
        }
    }

    /// Rebuild from the storage discriminator and optional fallback reason.
    pub fn from_parts(kind: u8, reason: Option<String>) -> Self {
        match kind {
            1 => HashSource::Origin,
            2 => HashSource::LocalFallback {
                reason: reason.unwrap_or_default(),
            },
            _ => HashSource::Local,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            HashSource::LocalFallback { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Everything about a meta except its id, which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDraft {
    pub board: Address,
    pub sender: Address,
    pub subject: Subject,
    pub raw_payload: Bytes,
    pub content_hash: Hash32,
    pub hash_source: HashSource,
    pub content: Option<ContentMeta>,
    pub outcome: MetaOutcome,
    pub block_number: Option<u64>,
}

/// One accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub id: MetaId,
    /// Back-reference to the owning board.
    pub board: Address,
    pub sender: Address,
    pub subject: Subject,
    /// The event payload, verbatim.
    pub raw_payload: Bytes,
    /// Digest of `raw_payload`.
    pub content_hash: Hash32,
    pub hash_source: HashSource,
    /// Present only when the outcome is [`MetaOutcome::ContentMaterialized`].
    pub content: Option<ContentMeta>,
    pub outcome: MetaOutcome,
    pub block_number: Option<u64>,
}

impl Meta {
    pub fn from_draft(id: MetaId, draft: MetaDraft) -> Self {
        Self {
            id,
            board: draft.board,
            sender: draft.sender,
            subject: draft.subject,
            raw_payload: draft.raw_payload,
            content_hash: draft.content_hash,
            hash_source: draft.hash_source,
            content: draft.content,
            outcome: draft.outcome,
            block_number: draft.block_number,
        }
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.content.as_ref().map(|c| &c.payload)
    }

    pub fn magic_number(&self) -> Option<&MagicNumber> {
        self.content.as_ref().map(|c| &c.magic_number)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.content_type.as_deref())
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.content_encoding.as_deref())
    }

    pub fn content_language(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.content_language.as_deref())
    }

    /// Content identifier of the decoded document, if any.
    pub fn content_id(&self) -> Option<Hash32> {
        self.content.as_ref().map(ContentMeta::content_id)
    }
}
