//! Database schema migrations for SQLite.
//!
//! Versioned migrations. Each migration transforms the schema from version N
//! to N+1 and is recorded in `schema_migrations`.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};
use crate::traits::IdScheme;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Record the id scheme on first open, or check it matches the stored one.
///
/// Ids from different schemes cannot coexist in one database.
pub fn bind_id_scheme(conn: &Connection, scheme: IdScheme) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO store_settings (key, value) VALUES ('id_scheme', ?1)",
        params![scheme.as_str()],
    )?;
    let stored: String = conn.query_row(
        "SELECT value FROM store_settings WHERE key = 'id_scheme'",
        [],
        |row| row.get(0),
    )?;
    if stored != scheme.as_str() {
        return Err(StoreError::Migration(format!(
            "database was created with id scheme '{stored}', opened with '{}'",
            scheme.as_str()
        )));
    }
    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per origin address
        CREATE TABLE boards (
            address BLOB PRIMARY KEY,            -- 20 bytes
            sequence_counter INTEGER NOT NULL DEFAULT 0
        );

        -- One row per accepted event
        CREATE TABLE metas (
            meta_key BLOB PRIMARY KEY,           -- MetaId::to_key
            board BLOB NOT NULL,                 -- 20 bytes, back-reference
            sender BLOB NOT NULL,                -- 20 bytes
            subject BLOB NOT NULL,               -- 32 bytes, big-endian
            raw_payload BLOB NOT NULL,
            content_hash BLOB NOT NULL,          -- 32 bytes
            hash_source INTEGER NOT NULL,        -- 0=local, 1=origin, 2=fallback
            hash_fallback_reason TEXT,
            outcome INTEGER NOT NULL,            -- MetaOutcome as u8
            payload BLOB,                        -- decoded content, all nullable
            magic_number BLOB,                   -- minimal big-endian
            content_type TEXT,
            content_encoding TEXT,
            content_language TEXT,
            content_id BLOB,
            block_number INTEGER                 -- NULL when the event carried none
        );

        -- Reversible writes for rollback
        CREATE TABLE journal (
            entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
            block INTEGER NOT NULL,
            kind INTEGER NOT NULL,               -- 0=board created, 1=meta created, 2=sequence advanced
            board BLOB,
            meta_key BLOB,
            previous INTEGER
        );

        CREATE TABLE store_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX idx_metas_board ON metas(board);
        CREATE INDEX idx_metas_content_hash ON metas(content_hash);
        CREATE INDEX idx_metas_content_id ON metas(content_id);
        CREATE INDEX idx_journal_block ON journal(block);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
