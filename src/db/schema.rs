//! SQL DDL for all secondbrain tables.
//!
//! Defines `interactions` (append-only turn log with embeddings), `notes`,
//! `note_contexts` (contributing snippets), `note_links` (directed cross
//! references) and `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Conversation turns. Rows are never updated or deleted.
CREATE TABLE IF NOT EXISTS interactions (
    id TEXT PRIMARY KEY,
    query_text TEXT NOT NULL,
    response_text TEXT NOT NULL,
    combined_text TEXT NOT NULL,
    embedding BLOB,
    embedding_dim INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_interactions_created ON interactions(created_at);

-- Topic notes, keyed by normalized title
CREATE TABLE IF NOT EXISTS notes (
    key TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    entity_type TEXT NOT NULL DEFAULT 'topic',
    content TEXT NOT NULL,
    is_placeholder INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Contributing snippets, in arrival order
CREATE TABLE IF NOT EXISTS note_contexts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_key TEXT NOT NULL REFERENCES notes(key) ON DELETE CASCADE,
    context TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_note_contexts_note ON note_contexts(note_key);

-- Directed links. target_key is a weak reference and may not resolve.
CREATE TABLE IF NOT EXISTS note_links (
    note_key TEXT NOT NULL REFERENCES notes(key) ON DELETE CASCADE,
    target_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (note_key, target_key)
);

CREATE INDEX IF NOT EXISTS idx_note_links_target ON note_links(target_key);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
