//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use metaboard_core::{Address, Board, Hash32, Meta, MetaDraft, MetaId};

use crate::error::{Result, StoreError};
use crate::traits::{
    Change, CommitOutcome, IdScheme, InsertResult, RevertReport, Store, StoreConfig,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    id_scheme: IdScheme,
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Boards ordered by address.
    boards: BTreeMap<Address, Board>,

    /// Metas indexed by id.
    metas: HashMap<MetaId, Meta>,

    /// Creation order of `metas`.
    meta_order: Vec<MetaId>,

    /// Reversible writes, oldest first, tagged with their block.
    journal: Vec<(u64, Change)>,
}

impl MemoryStoreInner {
    fn board(&self, origin: &Address) -> Result<Board> {
        self.boards
            .get(origin)
            .cloned()
            .ok_or(StoreError::BoardNotFound(*origin))
    }

    /// Validate before any mutation so a failed insert leaves no trace.
    fn check_insert(&self, meta: &Meta) -> Result<InsertResult> {
        if !self.boards.contains_key(&meta.board) {
            return Err(StoreError::BoardNotFound(meta.board));
        }
        if self.metas.contains_key(&meta.id) {
            return match meta.id {
                MetaId::Sequence { .. } => Err(StoreError::DuplicateMeta(meta.id)),
                MetaId::Hash(_) => Ok(InsertResult::AlreadyExists),
            };
        }
        Ok(InsertResult::Inserted)
    }

    fn insert(&mut self, meta: Meta, block: u64) {
        self.meta_order.push(meta.id);
        self.journal.push((block, Change::MetaCreated(meta.id)));
        self.metas.insert(meta.id, meta);
    }

    fn advance(&mut self, origin: &Address, block: u64) -> Result<Board> {
        let board = self
            .boards
            .get_mut(origin)
            .ok_or(StoreError::BoardNotFound(*origin))?;
        let previous = board.sequence_counter;
        board.sequence_counter = previous
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData(format!("sequence overflow on {origin}")))?;
        let board = board.clone();
        self.journal.push((
            block,
            Change::SequenceAdvanced {
                board: *origin,
                previous,
            },
        ));
        Ok(board)
    }

    fn undo(&mut self, change: Change, report: &mut RevertReport) {
        match change {
            Change::BoardCreated(origin) => {
                if self.boards.remove(&origin).is_some() {
                    report.boards_removed += 1;
                }
            }
            Change::MetaCreated(id) => {
                if self.metas.remove(&id).is_some() {
                    self.meta_order.retain(|m| m != &id);
                    report.metas_removed += 1;
                }
            }
            Change::SequenceAdvanced { board, previous } => {
                if let Some(b) = self.boards.get_mut(&board) {
                    b.sequence_counter = previous;
                    report.counters_restored += 1;
                }
            }
        }
    }

    fn collect(&self, filter: impl Fn(&Meta) -> bool) -> Vec<Meta> {
        self.meta_order
            .iter()
            .filter_map(|id| self.metas.get(id))
            .filter(|m| filter(m))
            .cloned()
            .collect()
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            id_scheme: config.id_scheme,
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn id_scheme(&self) -> IdScheme {
        self.id_scheme
    }

    async fn get_board(&self, origin: &Address) -> Result<Option<Board>> {
        let inner = self.read()?;
        Ok(inner.boards.get(origin).cloned())
    }

    async fn get_or_create_board(&self, origin: &Address, block: u64) -> Result<Board> {
        let mut inner = self.write()?;
        if let Some(board) = inner.boards.get(origin) {
            return Ok(board.clone());
        }
        let board = Board::new(*origin);
        inner.boards.insert(*origin, board.clone());
        inner.journal.push((block, Change::BoardCreated(*origin)));
        Ok(board)
    }

    async fn advance_sequence(&self, origin: &Address, block: u64) -> Result<Board> {
        let mut inner = self.write()?;
        inner.advance(origin, block)
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let inner = self.read()?;
        Ok(inner.boards.values().cloned().collect())
    }

    async fn create_meta(&self, meta: &Meta, block: u64) -> Result<InsertResult> {
        let mut inner = self.write()?;
        let result = inner.check_insert(meta)?;
        if result == InsertResult::Inserted {
            inner.insert(meta.clone(), block);
        }
        Ok(result)
    }

    async fn commit_event(&self, draft: MetaDraft) -> Result<CommitOutcome> {
        let mut inner = self.write()?;
        let block = draft.block_number.unwrap_or(0);
        let board = inner.board(&draft.board)?;

        let meta_id = self.id_scheme.assign(&board, &draft);
        let meta = Meta::from_draft(meta_id, draft);
        let insert = inner.check_insert(&meta)?;
        if insert == InsertResult::Inserted {
            inner.insert(meta, block);
        }
        let board = inner.advance(&board.id, block)?;

        Ok(CommitOutcome {
            meta_id,
            insert,
            board,
        })
    }

    async fn get_meta(&self, id: &MetaId) -> Result<Option<Meta>> {
        let inner = self.read()?;
        Ok(inner.metas.get(id).cloned())
    }

    async fn list_metas(&self, board: &Address) -> Result<Vec<Meta>> {
        let inner = self.read()?;
        Ok(inner.collect(|m| &m.board == board))
    }

    async fn metas_by_content_hash(&self, hash: &Hash32) -> Result<Vec<Meta>> {
        let inner = self.read()?;
        Ok(inner.collect(|m| &m.content_hash == hash))
    }

    async fn revert_to(&self, block: u64) -> Result<RevertReport> {
        let mut inner = self.write()?;
        let mut report = RevertReport::default();

        let journal = std::mem::take(&mut inner.journal);
        let (kept, undone): (Vec<_>, Vec<_>) = journal.into_iter().partition(|(b, _)| *b <= block);
        inner.journal = kept;

        for (_, change) in undone.into_iter().rev() {
            inner.undo(change, &mut report);
        }

        tracing::debug!(block, ?report, "reverted memory store");
        Ok(report)
    }

    async fn finalize(&self, block: u64) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.journal.len();
        inner.journal.retain(|(b, _)| *b > block);
        Ok(before - inner.journal.len())
    }
}
