//! Topic note storage: notes keyed by normalized title, their contributing
//! snippets, and directed links between them.
//!
//! Writes from the merge pipeline go through [`NoteStore::commit_merge`], which
//! lands placeholders, the primary note and its new snippet in one transaction.
//! Placeholders use `INSERT OR IGNORE`, so an existing note is never replaced
//! by a placeholder.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use super::merger::MergedNote;
use super::types::{Note, NoteSummary, RawContext};
use super::{format_timestamp, parse_timestamp};
use crate::error::{MemoryError, MemoryResult};

pub trait NoteStore: Send + Sync {
    fn get(&self, key: &str) -> MemoryResult<Option<Note>>;

    /// All note keys, sorted.
    fn keys(&self) -> MemoryResult<Vec<String>>;

    fn list(&self) -> MemoryResult<Vec<NoteSummary>>;

    /// Keys of notes that link to `key`.
    fn backlinks(&self, key: &str) -> MemoryResult<Vec<String>>;

    fn append_raw_context(&self, key: &str, context: &RawContext) -> MemoryResult<()>;

    /// Persist a merge result atomically: placeholders first, then the primary.
    fn commit_merge(&self, merged: &MergedNote) -> MemoryResult<()>;
}

#[derive(Clone)]
pub struct SqliteNoteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteNoteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> MemoryResult<T> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| MemoryError::persistence(format!("db lock poisoned: {e}")))?;
        f(&mut *conn).map_err(|e| MemoryError::persistence(format!("{e:#}")))
    }
}

impl NoteStore for SqliteNoteStore {
    fn get(&self, key: &str) -> MemoryResult<Option<Note>> {
        self.with_conn(|conn| load_note(conn, key))
    }

    fn keys(&self) -> MemoryResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM notes ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        })
    }

    fn list(&self) -> MemoryResult<Vec<NoteSummary>> {
        self.with_conn(|conn| list_notes(conn))
    }

    fn backlinks(&self, key: &str) -> MemoryResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT note_key FROM note_links WHERE target_key = ?1 ORDER BY note_key",
            )?;
            let keys = stmt
                .query_map(params![key], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        })
    }

    fn append_raw_context(&self, key: &str, context: &RawContext) -> MemoryResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            insert_context(&tx, key, context)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn commit_merge(&self, merged: &MergedNote) -> MemoryResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            for placeholder in &merged.placeholders {
                insert_placeholder(&tx, placeholder)?;
            }
            if merged.content_updated {
                upsert_note(&tx, &merged.note)?;
                replace_links(&tx, &merged.note.key, &merged.note.related)?;
            }
            insert_context(&tx, &merged.note.key, &merged.new_context)?;

            tx.commit()?;
            Ok(())
        })
    }
}

/// Load a note with its snippets and links.
pub fn load_note(conn: &Connection, key: &str) -> Result<Option<Note>> {
    let row = conn
        .query_row(
            "SELECT key, title, entity_type, content, is_placeholder, created_at, updated_at \
             FROM notes WHERE key = ?1",
            params![key],
            |row| {
                let created: String = row.get(5)?;
                let updated: String = row.get(6)?;
                Ok(Note {
                    key: row.get(0)?,
                    title: row.get(1)?,
                    entity_type: row.get(2)?,
                    content: row.get(3)?,
                    raw_contexts: Vec::new(),
                    related: Vec::new(),
                    is_placeholder: row.get(4)?,
                    created: parse_timestamp(&created)?,
                    last_updated: parse_timestamp(&updated)?,
                })
            },
        )
        .optional()?;

    let Some(mut note) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT context, topic, related_json, created_at FROM note_contexts \
         WHERE note_key = ?1 ORDER BY id",
    )?;
    note.raw_contexts = stmt
        .query_map(params![key], |row| {
            let related: String = row.get(2)?;
            let captured: String = row.get(3)?;
            Ok(RawContext {
                text: row.get(0)?,
                topic: row.get(1)?,
                related: serde_json::from_str(&related).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
                })?,
                captured_at: parse_timestamp(&captured)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt =
        conn.prepare("SELECT target_key FROM note_links WHERE note_key = ?1 ORDER BY position")?;
    note.related = stmt
        .query_map(params![key], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(Some(note))
}

pub fn list_notes(conn: &Connection) -> Result<Vec<NoteSummary>> {
    let mut stmt = conn.prepare(
        "SELECT n.key, n.title, n.entity_type, n.is_placeholder, n.updated_at, \
         (SELECT COUNT(*) FROM note_links l WHERE l.note_key = n.key) \
         FROM notes n ORDER BY n.updated_at DESC, n.key",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let updated: String = row.get(4)?;
            let links: i64 = row.get(5)?;
            Ok(NoteSummary {
                key: row.get(0)?,
                title: row.get(1)?,
                entity_type: row.get(2)?,
                is_placeholder: row.get(3)?,
                link_count: links as usize,
                last_updated: parse_timestamp(&updated)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert-if-absent. Links are written only when the row was actually created.
fn insert_placeholder(tx: &Transaction, note: &Note) -> Result<()> {
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO notes \
         (key, title, entity_type, content, is_placeholder, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
        params![
            note.key,
            note.title,
            note.entity_type,
            note.content,
            format_timestamp(&note.created),
            format_timestamp(&note.last_updated),
        ],
    )?;
    if inserted == 1 {
        replace_links(tx, &note.key, &note.related)?;
    } else {
        tracing::debug!(key = %note.key, "placeholder skipped, note already exists");
    }
    Ok(())
}

fn upsert_note(tx: &Transaction, note: &Note) -> Result<()> {
    tx.execute(
        "INSERT INTO notes (key, title, entity_type, content, is_placeholder, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6) \
         ON CONFLICT(key) DO UPDATE SET \
           title = excluded.title, \
           entity_type = excluded.entity_type, \
           content = excluded.content, \
           is_placeholder = 0, \
           updated_at = excluded.updated_at",
        params![
            note.key,
            note.title,
            note.entity_type,
            note.content,
            format_timestamp(&note.created),
            format_timestamp(&note.last_updated),
        ],
    )?;
    Ok(())
}

fn replace_links(tx: &Transaction, key: &str, related: &[String]) -> Result<()> {
    tx.execute("DELETE FROM note_links WHERE note_key = ?1", params![key])?;
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO note_links (note_key, target_key, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, target) in related.iter().enumerate() {
        stmt.execute(params![key, target, position as i64])?;
    }
    Ok(())
}

fn insert_context(tx: &Transaction, key: &str, context: &RawContext) -> Result<()> {
    tx.execute(
        "INSERT INTO note_contexts (note_key, context, topic, related_json, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            key,
            context.text,
            context.topic,
            serde_json::to_string(&context.related)?,
            format_timestamp(&context.captured_at),
        ],
    )?;
    Ok(())
}
