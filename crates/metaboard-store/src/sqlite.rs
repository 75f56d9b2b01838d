//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use metaboard_core::{
    Address, Board, ContentMeta, Hash32, HashSource, MagicNumber, Meta, MetaDraft, MetaId,
    MetaOutcome, Subject,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    Change, CommitOutcome, IdScheme, InsertResult, RevertReport, Store, StoreConfig,
};

const META_COLUMNS: &str = "meta_key, board, sender, subject, raw_payload, content_hash,
    hash_source, hash_fallback_reason, outcome, payload, magic_number, content_type,
    content_encoding, content_language, block_number";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    id_scheme: IdScheme,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist. Fails if the
    /// database was created with a different id scheme.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::init(Connection::open(path)?, config)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory(config: StoreConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(mut conn: Connection, config: StoreConfig) -> Result<Self> {
        migration::migrate(&mut conn)?;
        migration::bind_id_scheme(&conn, config.id_scheme)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            id_scheme: config.id_scheme,
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Raw column values of a `metas` row, before validation.
struct MetaRow {
    meta_key: Vec<u8>,
    board: Vec<u8>,
    sender: Vec<u8>,
    subject: Vec<u8>,
    raw_payload: Vec<u8>,
    content_hash: Vec<u8>,
    hash_source: u8,
    hash_fallback_reason: Option<String>,
    outcome: u8,
    payload: Option<Vec<u8>>,
    magic_number: Option<Vec<u8>>,
    content_type: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    block_number: Option<i64>,
}

impl MetaRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta_key: row.get("meta_key")?,
            board: row.get("board")?,
            sender: row.get("sender")?,
            subject: row.get("subject")?,
            raw_payload: row.get("raw_payload")?,
            content_hash: row.get("content_hash")?,
            hash_source: row.get("hash_source")?,
            hash_fallback_reason: row.get("hash_fallback_reason")?,
            outcome: row.get("outcome")?,
            payload: row.get("payload")?,
            magic_number: row.get("magic_number")?,
            content_type: row.get("content_type")?,
            content_encoding: row.get("content_encoding")?,
            content_language: row.get("content_language")?,
            block_number: row.get("block_number")?,
        })
    }

    fn into_meta(self) -> Result<Meta> {
        let outcome = MetaOutcome::from_u8(self.outcome)?;
        let content = match (self.payload, self.magic_number) {
            (Some(payload), Some(magic)) => Some(ContentMeta {
                payload: Bytes::from(payload),
                magic_number: MagicNumber::from_be_bytes(&magic),
                content_type: self.content_type,
                content_encoding: self.content_encoding,
                content_language: self.content_language,
            }),
            (None, None) => None,
            _ => {
                return Err(StoreError::InvalidData(
                    "meta row has payload without magic number".into(),
                ))
            }
        };
        if content.is_some() != outcome.has_content() {
            return Err(StoreError::InvalidData(format!(
                "meta row content does not match outcome {}",
                outcome.as_str()
            )));
        }

        Ok(Meta {
            id: MetaId::from_key(&self.meta_key)?,
            board: Address::try_from(self.board.as_slice())?,
            sender: Address::try_from(self.sender.as_slice())?,
            subject: Subject::try_from(self.subject.as_slice())?,
            raw_payload: Bytes::from(self.raw_payload),
            content_hash: Hash32::try_from(self.content_hash.as_slice())?,
            hash_source: HashSource::from_parts(self.hash_source, self.hash_fallback_reason),
            content,
            outcome,
            block_number: self.block_number.map(|b| b as u64),
        })
    }
}

fn query_metas(conn: &Connection, filter: &str, arg: &[u8]) -> Result<Vec<Meta>> {
    let sql = format!("SELECT {META_COLUMNS} FROM metas WHERE {filter} = ?1 ORDER BY rowid");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![arg], MetaRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(MetaRow::into_meta).collect()
}

fn load_board(conn: &Connection, origin: &Address) -> Result<Option<Board>> {
    let counter: Option<i64> = conn
        .query_row(
            "SELECT sequence_counter FROM boards WHERE address = ?1",
            params![origin.as_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(counter.map(|c| Board {
        id: *origin,
        sequence_counter: c as u64,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes (always inside a transaction)
// ─────────────────────────────────────────────────────────────────────────────

fn record(conn: &Connection, block: u64, change: &Change) -> Result<()> {
    let (board, meta_key, previous) = match change {
        Change::BoardCreated(origin) => (Some(origin.as_bytes().to_vec()), None, None),
        Change::MetaCreated(id) => (None, Some(id.to_key()), None),
        Change::SequenceAdvanced { board, previous } => {
            (Some(board.as_bytes().to_vec()), None, Some(*previous as i64))
        }
    };
    conn.execute(
        "INSERT INTO journal (block, kind, board, meta_key, previous) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![block as i64, change.kind(), board, meta_key, previous],
    )?;
    Ok(())
}

fn change_from_row(
    kind: i64,
    board: Option<Vec<u8>>,
    meta_key: Option<Vec<u8>>,
    previous: Option<i64>,
) -> Result<Change> {
    let address = || -> Result<Address> {
        let bytes = board
            .as_deref()
            .ok_or_else(|| StoreError::InvalidData("journal entry without board".into()))?;
        Ok(Address::try_from(bytes)?)
    };
    match kind {
        0 => Ok(Change::BoardCreated(address()?)),
        1 => {
            let key = meta_key
                .as_deref()
                .ok_or_else(|| StoreError::InvalidData("journal entry without meta".into()))?;
            Ok(Change::MetaCreated(MetaId::from_key(key)?))
        }
        2 => Ok(Change::SequenceAdvanced {
            board: address()?,
            previous: previous
                .ok_or_else(|| StoreError::InvalidData("journal entry without counter".into()))?
                as u64,
        }),
        other => Err(StoreError::InvalidData(format!(
            "unknown journal kind {other}"
        ))),
    }
}

fn create_board(conn: &Connection, origin: &Address, block: u64) -> Result<Board> {
    if let Some(board) = load_board(conn, origin)? {
        return Ok(board);
    }
    conn.execute(
        "INSERT INTO boards (address, sequence_counter) VALUES (?1, 0)",
        params![origin.as_bytes().as_slice()],
    )?;
    record(conn, block, &Change::BoardCreated(*origin))?;
    Ok(Board::new(*origin))
}

fn insert_meta(conn: &Connection, meta: &Meta, block: u64) -> Result<InsertResult> {
    if load_board(conn, &meta.board)?.is_none() {
        return Err(StoreError::BoardNotFound(meta.board));
    }

    let key = meta.id.to_key();
    let exists = conn
        .query_row(
            "SELECT 1 FROM metas WHERE meta_key = ?1",
            params![key],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        return match meta.id {
            MetaId::Sequence { .. } => Err(StoreError::DuplicateMeta(meta.id)),
            MetaId::Hash(_) => Ok(InsertResult::AlreadyExists),
        };
    }

    let content = meta.content.as_ref();
    conn.execute(
        "INSERT INTO metas (
            meta_key, board, sender, subject, raw_payload, content_hash,
            hash_source, hash_fallback_reason, outcome, payload, magic_number,
            content_type, content_encoding, content_language, content_id, block_number
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            key,
            meta.board.as_bytes().as_slice(),
            meta.sender.as_bytes().as_slice(),
            meta.subject.as_bytes().as_slice(),
            meta.raw_payload.as_ref(),
            meta.content_hash.as_bytes().as_slice(),
            meta.hash_source.kind(),
            meta.hash_source.reason(),
            meta.outcome.to_u8(),
            content.map(|c| &c.payload[..]),
            content.map(|c| c.magic_number.as_be_bytes()),
            content.and_then(|c| c.content_type.as_deref()),
            content.and_then(|c| c.content_encoding.as_deref()),
            content.and_then(|c| c.content_language.as_deref()),
            content.map(|c| c.content_id().as_bytes().to_vec()),
            meta.block_number.map(|b| b as i64),
        ],
    )?;
    record(conn, block, &Change::MetaCreated(meta.id))?;

    Ok(InsertResult::Inserted)
}

fn advance(conn: &Connection, origin: &Address, block: u64) -> Result<Board> {
    let board = load_board(conn, origin)?.ok_or(StoreError::BoardNotFound(*origin))?;
    let previous = board.sequence_counter;
    let next = previous
        .checked_add(1)
        .filter(|n| *n <= i64::MAX as u64)
        .ok_or_else(|| StoreError::InvalidData(format!("sequence overflow on {origin}")))?;
    conn.execute(
        "UPDATE boards SET sequence_counter = ?1 WHERE address = ?2",
        params![next as i64, origin.as_bytes().as_slice()],
    )?;
    record(
        conn,
        block,
        &Change::SequenceAdvanced {
            board: *origin,
            previous,
        },
    )?;
    Ok(Board {
        id: *origin,
        sequence_counter: next,
    })
}

fn undo(conn: &Connection, change: &Change, report: &mut RevertReport) -> Result<()> {
    match change {
        Change::BoardCreated(origin) => {
            report.boards_removed += conn.execute(
                "DELETE FROM boards WHERE address = ?1",
                params![origin.as_bytes().as_slice()],
            )?;
        }
        Change::MetaCreated(id) => {
            report.metas_removed +=
                conn.execute("DELETE FROM metas WHERE meta_key = ?1", params![id.to_key()])?;
        }
        Change::SequenceAdvanced { board, previous } => {
            report.counters_restored += conn.execute(
                "UPDATE boards SET sequence_counter = ?1 WHERE address = ?2",
                params![*previous as i64, board.as_bytes().as_slice()],
            )?;
        }
    }
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    fn id_scheme(&self) -> IdScheme {
        self.id_scheme
    }

    async fn get_board(&self, origin: &Address) -> Result<Option<Board>> {
        let origin = *origin;
        self.blocking(move |conn| load_board(conn, &origin)).await
    }

    async fn get_or_create_board(&self, origin: &Address, block: u64) -> Result<Board> {
        let origin = *origin;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let board = create_board(&tx, &origin, block)?;
            tx.commit()?;
            Ok(board)
        })
        .await
    }

    async fn advance_sequence(&self, origin: &Address, block: u64) -> Result<Board> {
        let origin = *origin;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let board = advance(&tx, &origin, block)?;
            tx.commit()?;
            Ok(board)
        })
        .await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT address, sequence_counter FROM boards ORDER BY address")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .map(|(address, counter)| -> Result<Board> {
                    Ok(Board {
                        id: Address::try_from(address.as_slice())?,
                        sequence_counter: counter as u64,
                    })
                })
                .collect()
        })
        .await
    }

    async fn create_meta(&self, meta: &Meta, block: u64) -> Result<InsertResult> {
        let meta = meta.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let result = insert_meta(&tx, &meta, block)?;
            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn commit_event(&self, draft: MetaDraft) -> Result<CommitOutcome> {
        let scheme = self.id_scheme;
        self.blocking(move |conn| {
            let block = draft.block_number.unwrap_or(0);
            let tx = conn.transaction()?;

            let board = load_board(&tx, &draft.board)?
                .ok_or(StoreError::BoardNotFound(draft.board))?;
            let meta_id = scheme.assign(&board, &draft);
            let meta = Meta::from_draft(meta_id, draft);

            let insert = insert_meta(&tx, &meta, block)?;
            let board = advance(&tx, &board.id, block)?;
            tx.commit()?;

            Ok(CommitOutcome {
                meta_id,
                insert,
                board,
            })
        })
        .await
    }

    async fn get_meta(&self, id: &MetaId) -> Result<Option<Meta>> {
        let key = id.to_key();
        self.blocking(move |conn| {
            let sql = format!("SELECT {META_COLUMNS} FROM metas WHERE meta_key = ?1");
            let row = conn
                .query_row(&sql, params![key], MetaRow::from_row)
                .optional()?;
            row.map(MetaRow::into_meta).transpose()
        })
        .await
    }

    async fn list_metas(&self, board: &Address) -> Result<Vec<Meta>> {
        let board = *board;
        self.blocking(move |conn| query_metas(conn, "board", board.as_bytes()))
            .await
    }

    async fn metas_by_content_hash(&self, hash: &Hash32) -> Result<Vec<Meta>> {
        let hash = *hash;
        self.blocking(move |conn| query_metas(conn, "content_hash", hash.as_bytes()))
            .await
    }

    async fn revert_to(&self, block: u64) -> Result<RevertReport> {
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let entries = {
                let mut stmt = tx.prepare(
                    "SELECT kind, board, meta_key, previous FROM journal
                     WHERE block > ?1 ORDER BY entry_id DESC",
                )?;
                let rows = stmt
                    .query_map(params![block as i64], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Option<Vec<u8>>>(1)?,
                            row.get::<_, Option<Vec<u8>>>(2)?,
                            row.get::<_, Option<i64>>(3)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };

            let mut report = RevertReport::default();
            for (kind, board, meta_key, previous) in entries {
                let change = change_from_row(kind, board, meta_key, previous)?;
                undo(&tx, &change, &mut report)?;
            }
            tx.execute("DELETE FROM journal WHERE block > ?1", params![block as i64])?;
            tx.commit()?;

            tracing::debug!(block, ?report, "reverted sqlite store");
            Ok(report)
        })
        .await
    }

    async fn finalize(&self, block: u64) -> Result<usize> {
        self.blocking(move |conn| {
            let removed =
                conn.execute("DELETE FROM journal WHERE block <= ?1", params![block as i64])?;
            tracing::trace!(block, removed, "finalized journal");
            Ok(removed)
        })
        .await
    }
}
