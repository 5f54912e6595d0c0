use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Response from `memory_stats` / `secondbrain stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub interactions: u64,
    pub interactions_with_embedding: u64,
    pub interactions_without_embedding: u64,
    pub notes: u64,
    pub placeholder_notes: u64,
    pub note_links: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_interaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_interaction: Option<String>,
}

/// Compute store statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn memory_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StatsResponse> {
    let (interactions, with_embedding) = conn.query_row(
        "SELECT COUNT(*), COUNT(embedding) FROM interactions",
        [],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;
    let (notes, placeholders) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_placeholder), 0) FROM notes",
        [],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;
    let links: i64 = conn.query_row("SELECT COUNT(*) FROM note_links", [], |row| row.get(0))?;
    let (oldest, newest) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM interactions",
        [],
        |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        interactions: interactions as u64,
        interactions_with_embedding: with_embedding as u64,
        interactions_without_embedding: (interactions - with_embedding) as u64,
        notes: notes as u64,
        placeholder_notes: placeholders as u64,
        note_links: links as u64,
        db_size_bytes,
        oldest_interaction: oldest,
        newest_interaction: newest,
    })
}
