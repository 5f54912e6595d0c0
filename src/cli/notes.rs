use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

use secondbrain::config::BrainConfig;
use secondbrain::memory::notes::{NoteStore, SqliteNoteStore};
use secondbrain::memory::resolver::normalize_title;

fn open_store(config: &BrainConfig) -> Result<SqliteNoteStore> {
    let conn = secondbrain::db::open_database(config.resolved_db_path())?;
    Ok(SqliteNoteStore::new(Arc::new(Mutex::new(conn))))
}

/// Print every note, most recently updated first.
pub fn list(config: &BrainConfig) -> Result<()> {
    let notes = open_store(config)?.list()?;

    if notes.is_empty() {
        println!("No notes yet.");
        return Ok(());
    }

    println!("{} note(s)\n", notes.len());
    for note in &notes {
        println!(
            "  {:<40} {:<10} {:>3} link(s)  {}{}",
            note.key,
            note.entity_type,
            note.link_count,
            note.last_updated.format("%Y-%m-%d %H:%M"),
            if note.is_placeholder { "  (placeholder)" } else { "" }
        );
    }
    Ok(())
}

/// Print one note's Markdown, its links and backlinks.
pub fn show(config: &BrainConfig, title: &str) -> Result<()> {
    let store = open_store(config)?;
    let key = normalize_title(title, config.notes.title_max_len);

    let note = store
        .get(&key)?
        .with_context(|| format!("no note titled '{title}' (key '{key}')"))?;
    let backlinks = store.backlinks(&note.key)?;

    println!("{}", note.content);
    println!();
    println!("{}", "-".repeat(40));
    println!("Key:        {}", note.key);
    println!("Type:       {}", note.entity_type);
    println!("Created:    {}", note.created.to_rfc3339());
    println!("Updated:    {}", note.last_updated.to_rfc3339());
    println!("Snippets:   {}", note.raw_contexts.len());
    println!("Links:      {}", note.related.join(", "));
    println!("Backlinks:  {}", backlinks.join(", "));
    Ok(())
}
