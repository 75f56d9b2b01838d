//! The Indexer: per-event orchestration over a [`Store`].
//!
//! Each event runs through board resolution, the decode pipeline and one
//! atomic commit. Events are handled strictly one at a time.

use std::sync::Arc;

use tokio::sync::Mutex;

use metaboard_core::{Address, Board, Hash32, Meta, MetaDraft, MetaId, MetaOutcome};
use metaboard_store::{RevertReport, SqliteStore, Store};

use crate::config::{IndexerConfig, NonContentPolicy};
use crate::error::Result;
use crate::event::{IngestReport, MetaV1Event};
use crate::hasher::{resolve_content_hash, OriginHasher};
use crate::pipeline::{classify, Classification};

/// The main Indexer struct.
pub struct Indexer<S: Store> {
    store: Arc<S>,
    config: IndexerConfig,
    hasher: Option<Arc<dyn OriginHasher>>,
    /// Serializes event handling and rollback.
    gate: Mutex<()>,
}

impl Indexer<SqliteStore> {
    /// Open the SQLite store named by `config` and build an indexer over it.
    pub fn open(config: IndexerConfig) -> Result<Self> {
        let store = match &config.database_path {
            Some(path) => SqliteStore::open(path, config.store.clone())?,
            None => SqliteStore::open_memory(config.store.clone())?,
        };
        Self::new(store, config)
    }
}

impl<S: Store> Indexer<S> {
    /// Create an indexer over `store`.
    ///
    /// Fails if `config` is incompatible with the store's id scheme.
    pub fn new(store: S, config: IndexerConfig) -> Result<Self> {
        config.validate(store.id_scheme())?;
        tracing::info!(
            id_scheme = store.id_scheme().as_str(),
            non_content = ?config.non_content,
            "indexer ready"
        );
        Ok(Self {
            store: Arc::new(store),
            config,
            hasher: None,
            gate: Mutex::new(()),
        })
    }

    /// Prefer the origin's own hash function for `content_hash`.
    pub fn with_hasher(mut self, hasher: Arc<dyn OriginHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Handling
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply one `MetaV1` event.
    ///
    /// Only store failures are returned as errors. Every payload, however
    /// malformed, ends in one of the [`MetaOutcome`] states and advances the
    /// board counter.
    pub async fn handle_event(&self, event: &MetaV1Event) -> Result<IngestReport> {
        let _turn = self.gate.lock().await;

        let origin = event.origin_address;
        let block = event.journal_block();

        let board = self.store.get_or_create_board(&origin, block).await?;
        tracing::debug!(%origin, block, counter = board.sequence_counter, "resolved board");

        let classification = classify(&event.meta);
        self.log_classification(event, &classification);

        let (content_hash, hash_source) = resolve_content_hash(
            self.hasher.as_deref(),
            &origin,
            &event.meta,
            self.config.hash_timeout(),
        )
        .await;

        if !classification.outcome.has_content()
            && self.config.non_content == NonContentPolicy::Skip
        {
            let board = self.store.advance_sequence(&origin, block).await?;
            tracing::info!(%origin, block, outcome = classification.outcome.as_str(), "skipped meta");
            return Ok(IngestReport {
                outcome: classification.outcome,
                meta_id: None,
                insert: None,
                sequence_counter: board.sequence_counter,
                content_hash,
                hash_source,
            });
        }

        let draft = MetaDraft {
            board: origin,
            sender: event.sender,
            subject: event.subject,
            raw_payload: event.meta.clone(),
            content_hash,
            hash_source: hash_source.clone(),
            content: classification.content,
            outcome: classification.outcome,
            block_number: event.block_number,
        };

        let committed = match self.store.commit_event(draft).await {
            Ok(committed) => committed,
            Err(e) => {
                if e.is_integrity_violation() {
                    tracing::error!(%origin, block, error = %e, "store integrity violated");
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            %origin,
            block,
            meta = %committed.meta_id,
            outcome = classification.outcome.as_str(),
            counter = committed.board.sequence_counter,
            "committed meta"
        );

        Ok(IngestReport {
            outcome: classification.outcome,
            meta_id: Some(committed.meta_id),
            insert: Some(committed.insert),
            sequence_counter: committed.board.sequence_counter,
            content_hash,
            hash_source,
        })
    }

    /// Apply events in order, stopping at the first fatal error.
    pub async fn handle_events<I>(&self, events: I) -> Result<Vec<IngestReport>>
    where
        I: IntoIterator<Item = MetaV1Event>,
    {
        let mut reports = Vec::new();
        for event in events {
            reports.push(self.handle_event(&event).await?);
        }
        Ok(reports)
    }

    fn log_classification(&self, event: &MetaV1Event, classification: &Classification) {
        let origin = &event.origin_address;
        let block = event.block_number;
        match classification.outcome {
            MetaOutcome::ContentMaterialized => {
                tracing::debug!(%origin, ?block, "materialized content");
            }
            MetaOutcome::NoContent => {
                tracing::debug!(%origin, ?block, "payload is not a meta document");
            }
            MetaOutcome::UnsupportedShape
            | MetaOutcome::DecodeError
            | MetaOutcome::InvalidContent => {
                tracing::warn!(
                    %origin,
                    ?block,
                    outcome = classification.outcome.as_str(),
                    detail = classification.detail.as_deref().unwrap_or(""),
                    payload = %payload_preview(&event.meta, self.config.log_payload_bytes),
                    "meta document rejected"
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Replay
    // ─────────────────────────────────────────────────────────────────────────

    /// Undo everything applied for blocks after `block`.
    pub async fn revert_to(&self, block: u64) -> Result<RevertReport> {
        let _turn = self.gate.lock().await;
        let report = self.store.revert_to(block).await?;
        tracing::info!(
            block,
            metas = report.metas_removed,
            boards = report.boards_removed,
            counters = report.counters_restored,
            "reverted"
        );
        Ok(report)
    }

    /// Make blocks at or below `block` permanent.
    pub async fn finalize(&self, block: u64) -> Result<usize> {
        let _turn = self.gate.lock().await;
        Ok(self.store.finalize(block).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn board(&self, origin: &Address) -> Result<Option<Board>> {
        Ok(self.store.get_board(origin).await?)
    }

    pub async fn boards(&self) -> Result<Vec<Board>> {
        Ok(self.store.list_boards().await?)
    }

    pub async fn meta(&self, id: &MetaId) -> Result<Option<Meta>> {
        Ok(self.store.get_meta(id).await?)
    }

    /// Metas of one board, in submission order.
    pub async fn metas(&self, origin: &Address) -> Result<Vec<Meta>> {
        Ok(self.store.list_metas(origin).await?)
    }

    /// Metas whose raw payload hashed to `hash`.
    pub async fn metas_by_hash(&self, hash: &Hash32) -> Result<Vec<Meta>> {
        Ok(self.store.metas_by_content_hash(hash).await?)
    }
}

/// Lowercase hex of at most `limit` bytes, marked when truncated.
fn payload_preview(raw: &[u8], limit: usize) -> String {
    if raw.len() <= limit {
        hex::encode(raw)
    } else {
        format!("{}... ({} bytes)", hex::encode(&raw[..limit]), raw.len())
    }
}
