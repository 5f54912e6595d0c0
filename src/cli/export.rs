use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

use secondbrain::config::BrainConfig;
use secondbrain::memory::notes::{NoteStore, SqliteNoteStore};
use secondbrain::memory::types::Note;

/// Write every note to `dir` as `{key}.md`, so `[[key]]` links resolve in
/// Obsidian-style editors.
pub fn export(config: &BrainConfig, dir: &Path) -> Result<()> {
    let conn = secondbrain::db::open_database(config.resolved_db_path())?;
    let store = SqliteNoteStore::new(Arc::new(Mutex::new(conn)));

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir: {}", dir.display()))?;

    let mut written = 0usize;
    for summary in store.list()? {
        let Some(note) = store.get(&summary.key)? else {
            continue;
        };
        let path = dir.join(format!("{}.md", note.key));
        std::fs::write(&path, render_export(&note)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written += 1;
    }

    eprintln!("Exported {written} note(s) to {}.", dir.display());
    Ok(())
}

/// Front matter followed by the note body. The title is a JSON string, which
/// YAML reads as a double-quoted scalar.
fn render_export(note: &Note) -> Result<String> {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: {}\n", serde_json::to_string(&note.title)?));
    out.push_str(&format!("type: {}\n", note.entity_type));
    if note.is_placeholder {
        out.push_str("placeholder: true\n");
    }
    out.push_str(&format!("created: {}\n", note.created.to_rfc3339()));
    out.push_str(&format!("updated: {}\n", note.last_updated.to_rfc3339()));
    out.push_str("---\n\n");
    out.push_str(&note.content);
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(title: &str) -> Note {
        let now = Utc::now();
        Note {
            key: "rust".into(),
            title: title.into(),
            entity_type: "topic".into(),
            content: "# Rust\n\nBody.".into(),
            raw_contexts: Vec::new(),
            related: Vec::new(),
            is_placeholder: false,
            created: now,
            last_updated: now,
        }
    }

    #[test]
    fn export_has_front_matter_and_body() {
        let text = render_export(&note("Rust \"lang\"")).unwrap();
        assert!(text.starts_with("---\ntitle: \"Rust \\\"lang\\\"\"\ntype: topic\n"));
        assert!(!text.contains("placeholder"));
        assert!(text.ends_with("---\n\n# Rust\n\nBody.\n"));
    }

    #[test]
    fn title_with_newline_and_backslash_stays_on_one_line() {
        let text = render_export(&note("C:\\dev\nnotes")).unwrap();
        assert!(text.starts_with("---\ntitle: \"C:\\\\dev\\nnotes\"\ntype: topic\n"));
    }
}
