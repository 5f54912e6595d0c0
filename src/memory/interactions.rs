//! Append-only log of conversation turns.
//!
//! [`InteractionStore`] exposes only `append` and snapshot reads. The SQLite
//! implementation writes each turn in a single statement, so readers never see
//! a partially written record.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use rusqlite::{params, Connection};

use super::types::{InteractionRecord, NewInteraction};
use super::{bytes_to_embedding, embedding_to_bytes, format_timestamp, parse_timestamp};
use crate::error::{MemoryError, MemoryResult};

pub trait InteractionStore: Send + Sync {
    /// Store a turn, assigning `id` and `timestamp` if absent. Returns once the
    /// row is committed.
    fn append(&self, record: NewInteraction) -> MemoryResult<InteractionRecord>;

    /// Snapshot of every stored turn, oldest first.
    fn all_records(&self) -> MemoryResult<Vec<InteractionRecord>>;

    fn count(&self) -> MemoryResult<u64>;
}

/// SQLite-backed [`InteractionStore`] sharing a connection with the note store.
#[derive(Clone)]
pub struct SqliteInteractionStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteInteractionStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> MemoryResult<T> {
        let conn = self
            .db
            .lock()
            .map_err(|e| MemoryError::persistence(format!("db lock poisoned: {e}")))?;
        f(&*conn).map_err(|e| MemoryError::persistence(format!("{e:#}")))
    }
}

impl InteractionStore for SqliteInteractionStore {
    fn append(&self, record: NewInteraction) -> MemoryResult<InteractionRecord> {
        self.with_conn(|conn| insert_interaction(conn, record))
    }

    fn all_records(&self) -> MemoryResult<Vec<InteractionRecord>> {
        self.with_conn(load_interactions)
    }

    fn count(&self) -> MemoryResult<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }
}

/// Insert one turn.
pub fn insert_interaction(conn: &Connection, record: NewInteraction) -> Result<InteractionRecord> {
    let id = record
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    let timestamp = record.timestamp.unwrap_or_else(chrono::Utc::now);
    let combined_text = record.combined_text();

    let embedding_bytes = record.embedding.as_deref().map(embedding_to_bytes);
    let embedding_dim = record.embedding.as_ref().map(|e| e.len() as i64);

    conn.execute(
        "INSERT INTO interactions \
         (id, query_text, response_text, combined_text, embedding, embedding_dim, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            record.query_text,
            record.response_text,
            combined_text,
            embedding_bytes,
            embedding_dim,
            format_timestamp(&timestamp),
        ],
    )?;

    Ok(InteractionRecord {
        id,
        query_text: record.query_text,
        response_text: record.response_text,
        combined_text,
        embedding: record.embedding,
        timestamp,
    })
}

/// Load every turn, oldest first. Unreadable embeddings load as `None`.
pub fn load_interactions(conn: &Connection) -> Result<Vec<InteractionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, query_text, response_text, combined_text, embedding, embedding_dim, created_at \
         FROM interactions ORDER BY created_at, rowid",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let blob: Option<Vec<u8>> = row.get(4)?;
            let dim: Option<i64> = row.get(5)?;
            let created_at: String = row.get(6)?;
            Ok(InteractionRecord {
                id: row.get(0)?,
                query_text: row.get(1)?,
                response_text: row.get(2)?,
                combined_text: row.get(3)?,
                embedding: blob.and_then(|b| bytes_to_embedding(&b, dim.map(|d| d as usize))),
                timestamp: parse_timestamp(&created_at)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
