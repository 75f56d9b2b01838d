//! Store trait: the abstract interface for board and meta persistence.
//!
//! This trait keeps the indexer storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use metaboard_core::{Address, Board, ContentMeta, Hash32, Meta, MetaDraft, MetaId};

use crate::error::Result;

/// How meta ids are assigned. Fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdScheme {
    /// `(board, sequence_counter)` at the time of the event. Duplicates are fatal.
    #[default]
    Sequence,
    /// The meta's `content_hash`. Re-submissions collapse onto one meta.
    RawPayloadHash,
    /// Content id of the decoded document, or the meta's `content_hash` when
    /// nothing was decoded.
    ContentHash,
}

impl IdScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            IdScheme::Sequence => "sequence",
            IdScheme::RawPayloadHash => "raw-payload-hash",
            IdScheme::ContentHash => "content-hash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sequence" => Some(IdScheme::Sequence),
            "raw-payload-hash" => Some(IdScheme::RawPayloadHash),
            "content-hash" => Some(IdScheme::ContentHash),
            _ => None,
        }
    }

    /// Assign the id for a draft about to be committed on `board`.
    pub fn assign(self, board: &Board, draft: &MetaDraft) -> MetaId {
        match self {
            IdScheme::Sequence => MetaId::Sequence {
                board: board.id,
                seq: board.sequence_counter,
            },
            IdScheme::RawPayloadHash => MetaId::Hash(draft.content_hash),
            IdScheme::ContentHash => MetaId::Hash(
                draft
                    .content
                    .as_ref()
                    .map_or(draft.content_hash, ContentMeta::content_id),
            ),
        }
    }
}

/// Store configuration, chosen once when the store is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub id_scheme: IdScheme,
}

/// Result of creating a meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Meta was created.
    Inserted,
    /// A meta with the same content-derived id exists (idempotent, not an error).
    AlreadyExists,
}

/// Result of committing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The id the meta was stored (or found) under.
    pub meta_id: MetaId,
    pub insert: InsertResult,
    /// The board after its counter advanced.
    pub board: Board,
}

/// What a rollback undid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertReport {
    pub metas_removed: usize,
    pub boards_removed: usize,
    pub counters_restored: usize,
}

/// A reversible write, recorded with the block that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    BoardCreated(Address),
    MetaCreated(MetaId),
    SequenceAdvanced { board: Address, previous: u64 },
}

/// Journal kinds as stored in SQLite.
impl Change {
    pub(crate) fn kind(&self) -> i64 {
        match self {
            Change::BoardCreated(_) => 0,
            Change::MetaCreated(_) => 1,
            Change::SequenceAdvanced { .. } => 2,
        }
    }
}

/// The Store trait: async interface for aggregate persistence.
///
/// # Design Notes
///
/// - **Board first**: a meta can only be committed for a board that already
///   exists ([`Store::get_or_create_board`]).
/// - **Create, then advance**: [`Store::commit_event`] creates the meta and
///   advances the board counter in one atomic unit, in that order.
/// - **Counter**: the sequence counter is only ever changed by
///   [`Store::advance_sequence`] and [`Store::commit_event`].
/// - **Reversible**: every write is journaled with its block number so
///   [`Store::revert_to`] can restore the state as of an earlier block.
#[async_trait]
pub trait Store: Send + Sync {
    /// The identifier scheme this store was opened with.
    fn id_scheme(&self) -> IdScheme;

    // ─────────────────────────────────────────────────────────────────────────
    // Board Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a board by origin address.
    async fn get_board(&self, origin: &Address) -> Result<Option<Board>>;

    /// Return the existing board unchanged, or create it with a zero counter.
    async fn get_or_create_board(&self, origin: &Address, block: u64) -> Result<Board>;

    /// Increment a board's counter by exactly one.
    async fn advance_sequence(&self, origin: &Address, block: u64) -> Result<Board>;

    /// List all boards.
    async fn list_boards(&self) -> Result<Vec<Board>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Meta Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a meta under its already-assigned id.
    ///
    /// # Returns
    /// - `Inserted` if the meta was new.
    /// - `AlreadyExists` if a content-derived id is already stored.
    /// - `StoreError::DuplicateMeta` if a sequence id is already stored.
    async fn create_meta(&self, meta: &Meta, block: u64) -> Result<InsertResult>;

    /// Assign an id, create the meta and advance the board, atomically.
    ///
    /// The block used for journaling is `draft.block_number`, or 0.
    async fn commit_event(&self, draft: MetaDraft) -> Result<CommitOutcome>;

    /// Get a meta by id.
    async fn get_meta(&self, id: &MetaId) -> Result<Option<Meta>>;

    /// All metas whose back-reference is `board`, in creation order.
    async fn list_metas(&self, board: &Address) -> Result<Vec<Meta>>;

    /// All metas with the given raw payload digest, in creation order.
    async fn metas_by_content_hash(&self, hash: &Hash32) -> Result<Vec<Meta>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Journal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Undo every write made for blocks after `block`, newest first.
    async fn revert_to(&self, block: u64) -> Result<RevertReport>;

    /// Drop journal entries for blocks at or below `block`. They can no
    /// longer be reverted. Returns the number of entries dropped.
    async fn finalize(&self, block: u64) -> Result<usize>;
}

/// Extension trait for common store checks.
pub trait StoreExt: Store {
    /// Whether `sequence_counter` equals the number of metas stored for the
    /// board. Only meaningful under [`IdScheme::Sequence`].
    fn board_is_consistent(
        &self,
        origin: &Address,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn board_is_consistent(&self, origin: &Address) -> Result<bool> {
        let counter = self
            .get_board(origin)
            .await?
            .map(|b| b.sequence_counter)
            .unwrap_or(0);
        let metas = self.list_metas(origin).await?;
        Ok(counter == metas.len() as u64)
    }
}
