//! Folds a new [`TopicExtract`] into a note.
//!
//! A fresh note (or a placeholder being filled in for the first time) is
//! rendered locally. An existing note is merged by the judgment provider and
//! then re-shaped here: title line kept, old update markers and separators
//! dropped, the `## Related` section rebuilt from the unioned link set, one new
//! marker appended. If the oracle fails or returns nothing, the note is left as
//! it was and only the snippet is recorded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use super::resolver::normalize_title;
use super::types::{Note, RawContext, TopicExtract, DEFAULT_ENTITY_TYPE, PLACEHOLDER_ENTITY_TYPE};
use crate::error::bounded;
use crate::judgment::JudgmentProvider;

const RELATED_HEADING: &str = "## Related";
const MARKER_PREFIX: &str = "Last updated:";

/// Result of a merge, ready for [`NoteStore::commit_merge`](super::notes::NoteStore::commit_merge).
#[derive(Debug, Clone)]
pub struct MergedNote {
    /// The primary note as it should look after the merge.
    pub note: Note,
    /// Placeholder notes for related concepts that did not exist yet.
    pub placeholders: Vec<Note>,
    /// Snippet to append to the primary note's raw contexts.
    pub new_context: RawContext,
    /// `false` when the merge was aborted and `note` content is unchanged.
    pub content_updated: bool,
}

pub struct NoteMerger {
    judge: Arc<dyn JudgmentProvider>,
    timeout: Duration,
    title_max_len: usize,
}

impl NoteMerger {
    pub fn new(judge: Arc<dyn JudgmentProvider>, timeout: Duration, title_max_len: usize) -> Self {
        Self {
            judge,
            timeout,
            title_max_len,
        }
    }

    /// Merge `extract` into `existing` (or create a note when `None`).
    ///
    /// `known_keys` is the set of keys already in the store; related concepts
    /// outside it get a placeholder that links back to the primary note.
    pub async fn merge_into_note(
        &self,
        existing: Option<&Note>,
        extract: &TopicExtract,
        known_keys: &[String],
        now: DateTime<Utc>,
    ) -> MergedNote {
        let new_context = RawContext::from_extract(extract, now);

        let primary_key = match existing {
            Some(note) => note.key.clone(),
            None => normalize_title(&extract.primary_topic, self.title_max_len),
        };
        let related = self.related_concepts(extract, &primary_key);
        let related_keys: Vec<String> = related.iter().map(|(k, _)| k.clone()).collect();

        let note = match existing {
            Some(note) if !note.is_placeholder => {
                match self.merge_existing(note, extract, &related_keys, now).await {
                    Some(merged) => merged,
                    None => {
                        let mut unchanged = note.clone();
                        unchanged.raw_contexts.push(new_context.clone());
                        return MergedNote {
                            note: unchanged,
                            placeholders: Vec::new(),
                            new_context,
                            content_updated: false,
                        };
                    }
                }
            }
            Some(placeholder) => {
                let links = union_links(&placeholder.related, &related_keys);
                let entity_type = extract
                    .entity_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
                Note {
                    content: render_note(&placeholder.title, &extract.summary, &links, now),
                    entity_type,
                    related: links,
                    is_placeholder: false,
                    last_updated: now,
                    ..placeholder.clone()
                }
            }
            None => {
                let title = extract.primary_topic.trim().to_string();
                Note {
                    key: primary_key.clone(),
                    content: render_note(&title, &extract.summary, &related_keys, now),
                    title,
                    entity_type: extract
                        .entity_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string()),
                    raw_contexts: Vec::new(),
                    related: related_keys.clone(),
                    is_placeholder: false,
                    created: now,
                    last_updated: now,
                }
            }
        };

        let mut note = note;
        note.raw_contexts.push(new_context.clone());

        let placeholders = related
            .iter()
            .filter(|(key, _)| !known_keys.contains(key))
            .map(|(key, title)| placeholder_note(key, title, &primary_key, now))
            .collect();

        MergedNote {
            note,
            placeholders,
            new_context,
            content_updated: true,
        }
    }

    /// Normalized, deduplicated related concepts, excluding the primary itself.
    fn related_concepts(&self, extract: &TopicExtract, primary_key: &str) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        for concept in &extract.related_concepts {
            let key = normalize_title(concept, self.title_max_len);
            if key == primary_key || out.iter().any(|(k, _)| *k == key) {
                continue;
            }
            out.push((key, concept.trim().to_string()));
        }
        out
    }

    async fn merge_existing(
        &self,
        note: &Note,
        extract: &TopicExtract,
        related_keys: &[String],
        now: DateTime<Utc>,
    ) -> Option<Note> {
        let marker = update_marker(now);
        let new_info = describe_extract(extract, related_keys);

        let merged = bounded(
            "judgment",
            self.timeout,
            self.judge.merge_content(&note.content, &new_info, &marker),
        )
        .await;

        let merged = match merged {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(key = %note.key, "merge returned empty content, note left unchanged");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %note.key, error = %e, "merge failed, note left unchanged");
                return None;
            }
        };

        let links = union_links(&note.related, related_keys);
        let content = reshape_merged(&note.content, &note.title, &merged, &links, now);

        Some(Note {
            content,
            related: links,
            last_updated: now,
            ..note.clone()
        })
    }
}

pub fn update_marker(now: DateTime<Utc>) -> String {
    format!(
        "_{MARKER_PREFIX} {}_",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Body for a newly created note.
pub fn render_note(title: &str, summary: &str, links: &[String], now: DateTime<Utc>) -> String {
    let mut out = format!("# {title}\n\n{}", summary.trim());
    push_related(&mut out, links);
    out.push_str("\n\n");
    out.push_str(&update_marker(now));
    out
}

fn placeholder_note(key: &str, title: &str, primary_key: &str, now: DateTime<Utc>) -> Note {
    Note {
        key: key.to_string(),
        title: title.to_string(),
        entity_type: PLACEHOLDER_ENTITY_TYPE.to_string(),
        content: format!("# {title}\n\n_Placeholder note. Referenced from [[{primary_key}]]._"),
        raw_contexts: Vec::new(),
        related: vec![primary_key.to_string()],
        is_placeholder: true,
        created: now,
        last_updated: now,
    }
}

fn describe_extract(extract: &TopicExtract, related_keys: &[String]) -> String {
    let mut out = extract.summary.trim().to_string();
    if !related_keys.is_empty() {
        let links: Vec<String> = related_keys.iter().map(|k| format!("[[{k}]]")).collect();
        out.push_str("\n\nRelated: ");
        out.push_str(&links.join(", "));
    }
    out
}

/// Order-stable union without duplicates.
pub fn union_links(existing: &[String], new: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(existing.len() + new.len());
    for key in existing.iter().chain(new) {
        if !out.contains(key) {
            out.push(key.clone());
        }
    }
    out
}

/// Apply the merge policy to oracle output.
pub fn reshape_merged(
    original: &str,
    title: &str,
    merged: &str,
    links: &[String],
    now: DateTime<Utc>,
) -> String {
    let title_line = original
        .lines()
        .find(|l| !l.trim().is_empty())
        .filter(|l| l.starts_with("# "))
        .map(str::to_string)
        .unwrap_or_else(|| format!("# {title}"));

    let mut body: Vec<&str> = Vec::new();
    let mut in_related = false;
    let mut seen_heading = false;
    for line in merged.lines() {
        let trimmed = line.trim();
        if !seen_heading && trimmed.starts_with("# ") {
            seen_heading = true;
            continue;
        }
        if in_related {
            if trimmed.is_empty() || trimmed.starts_with("- ") || trimmed.starts_with("* ") {
                continue;
            }
            in_related = false;
        }
        if trimmed.eq_ignore_ascii_case(RELATED_HEADING) {
            in_related = true;
            continue;
        }
        if is_separator(trimmed) || is_marker(trimmed) || is_inline_related(trimmed) {
            continue;
        }
        if !trimmed.is_empty() {
            seen_heading = true;
        }
        body.push(line);
    }

    let body = collapse_blank_lines(&body);
    let mut out = title_line;
    if !body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&body);
    }
    push_related(&mut out, links);
    out.push_str("\n\n");
    out.push_str(&update_marker(now));
    out
}

fn push_related(out: &mut String, links: &[String]) {
    if links.is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(RELATED_HEADING);
    for key in links {
        out.push_str(&format!("\n- [[{key}]]"));
    }
}

fn is_separator(line: &str) -> bool {
    line.len() >= 3 && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '*'))
}

/// `_Last updated: <date>_` or `Generated on <date>`. The date is required so
/// prose that happens to start with those words survives.
fn is_marker(line: &str) -> bool {
    let inner = line.trim_matches(|c| c == '_' || c == '*').trim();
    let lower = inner.to_ascii_lowercase();
    ["last updated:", "generated on"].iter().any(|prefix| {
        lower
            .strip_prefix(prefix)
            .is_some_and(|rest| starts_with_date(rest.trim_start_matches([' ', ':', '*', '_'])))
    })
}

/// `YYYY-` prefix, as in an RFC 3339 or ISO date.
fn starts_with_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 5 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'-'
}

fn is_inline_related(line: &str) -> bool {
    line.to_ascii_lowercase().starts_with("related:")
}

fn collapse_blank_lines(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim().is_empty() && out.last().is_none_or(|l| l.trim().is_empty()) {
            continue;
        }
        out.push(line.trim_end());
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MemoryError, MemoryResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Returns a canned merge answer and records what it was asked.
    struct CannedMerge {
        answer: Option<String>,
        seen: Mutex<Vec<(String, String, String)>>,
    }

    impl CannedMerge {
        fn new(answer: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JudgmentProvider for CannedMerge {
        async fn extract_topic(&self, _: &str, _: &str) -> MemoryResult<TopicExtract> {
            unreachable!()
        }

        async fn pick_similar_title(&self, _: &str, _: &[String]) -> MemoryResult<Option<String>> {
            unreachable!()
        }

        async fn merge_content(&self, existing: &str, info: &str, marker: &str) -> MemoryResult<String> {
            self.seen
                .lock()
                .unwrap()
                .push((existing.into(), info.into(), marker.into()));
            self.answer
                .clone()
                .ok_or_else(|| MemoryError::unavailable("judgment", "offline"))
        }
    }

    fn merger(judge: Arc<CannedMerge>) -> NoteMerger {
        NoteMerger::new(judge, Duration::from_secs(1), 100)
    }

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn extract(topic: &str, summary: &str, related: &[&str]) -> TopicExtract {
        TopicExtract {
            primary_topic: topic.into(),
            entity_type: None,
            summary: summary.into(),
            related_concepts: related.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn new_note_with_two_related_creates_two_placeholders() {
        let judge = CannedMerge::new(None);
        let merged = merger(judge.clone())
            .merge_into_note(
                None,
                &extract(
                    "React State Management",
                    "Hooks like useState hold component state.",
                    &["React", "State Management"],
                ),
                &[],
                t(9),
            )
            .await;

        assert!(merged.content_updated);
        assert_eq!(merged.note.key, "react_state_management");
        assert_eq!(merged.note.title, "React State Management");
        assert_eq!(merged.note.related, vec!["react", "state_management"]);
        assert!(merged.note.content.starts_with("# React State Management\n\nHooks like useState"));
        assert!(merged.note.content.contains("- [[react]]"));
        assert_eq!(merged.note.raw_contexts.len(), 1);

        assert_eq!(merged.placeholders.len(), 2);
        for placeholder in &merged.placeholders {
            assert!(placeholder.is_placeholder);
            assert_eq!(placeholder.related, vec!["react_state_management"]);
            assert!(placeholder.content.contains("[[react_state_management]]"));
        }
        assert!(judge.seen.lock().unwrap().is_empty(), "creation needs no oracle");
    }

    #[tokio::test]
    async fn known_related_concepts_get_no_placeholder() {
        let merged = merger(CannedMerge::new(None))
            .merge_into_note(
                None,
                &extract("Hooks", "s", &["React", "react", "Hooks", "JSX"]),
                &["react".to_string()],
                t(9),
            )
            .await;

        assert_eq!(merged.note.related, vec!["react", "jsx"]);
        let keys: Vec<&str> = merged.placeholders.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["jsx"]);
    }

    fn existing_note() -> Note {
        Note {
            key: "rust".into(),
            title: "Rust".into(),
            entity_type: "topic".into(),
            content: render_note("Rust", "A systems language.", &["cargo".to_string()], t(8)),
            raw_contexts: vec![RawContext {
                text: "A systems language.".into(),
                topic: "Rust".into(),
                related: vec!["Cargo".into()],
                captured_at: t(8),
            }],
            related: vec!["cargo".into()],
            is_placeholder: false,
            created: t(8),
            last_updated: t(8),
        }
    }

    #[tokio::test]
    async fn failed_merge_leaves_content_unchanged() {
        let note = existing_note();
        let merged = merger(CannedMerge::new(None))
            .merge_into_note(Some(&note), &extract("Rust", "Has no GC.", &["Memory Safety"]), &[], t(10))
            .await;

        assert!(!merged.content_updated);
        assert_eq!(merged.note.content, note.content);
        assert_eq!(merged.note.related, note.related);
        assert_eq!(merged.note.raw_contexts.len(), 2);
        assert_eq!(merged.new_context.text, "Has no GC.");
        assert!(merged.placeholders.is_empty());
    }

    #[tokio::test]
    async fn aborted_merge_keeps_related_labels_in_context() {
        let note = existing_note();
        let merged = merger(CannedMerge::new(None))
            .merge_into_note(Some(&note), &extract("Rust", "Has traits.", &["Tokio", "Serde"]), &[], t(10))
            .await;

        assert!(!merged.content_updated);
        assert_eq!(merged.new_context.topic, "Rust");
        assert_eq!(merged.new_context.related, vec!["Tokio", "Serde"]);
        let last = merged.note.raw_contexts.last().unwrap();
        assert_eq!(last.related, vec!["Tokio", "Serde"]);
        assert_eq!(last.captured_at, t(10));
    }

    #[tokio::test]
    async fn empty_merge_answer_is_aborted() {
        let note = existing_note();
        let merged = merger(CannedMerge::new(Some("   \n")))
            .merge_into_note(Some(&note), &extract("Rust", "Has no GC.", &[]), &[], t(10))
            .await;

        assert!(!merged.content_updated);
        assert_eq!(merged.note.content, note.content);
    }

    #[tokio::test]
    async fn successful_merge_applies_policy() {
        let note = existing_note();
        let answer = "# Rust (the language)\n\nA systems language without a garbage collector.\n\n---\n\n\
                      _Last updated: 2026-03-01T08:00:00Z_\n\n## Related\n- [[cargo]]\n- [[bogus]]\n\n\
                      _Last updated: 2026-03-01T10:00:00Z_";
        let judge = CannedMerge::new(Some(answer));
        let merged = merger(judge.clone())
            .merge_into_note(
                Some(&note),
                &extract("Rust", "Rust has no GC.", &["Memory Safety", "Cargo"]),
                &["rust".to_string(), "cargo".to_string()],
                t(10),
            )
            .await;

        assert!(merged.content_updated);
        assert_eq!(merged.note.related, vec!["cargo", "memory_safety"]);
        assert_eq!(
            merged.note.content,
            "# Rust\n\nA systems language without a garbage collector.\n\n\
             ## Related\n- [[cargo]]\n- [[memory_safety]]\n\n_Last updated: 2026-03-01T10:00:00Z_"
        );
        assert_eq!(merged.note.created, t(8));
        assert_eq!(merged.note.last_updated, t(10));
        assert_eq!(merged.placeholders.len(), 1);
        assert_eq!(merged.placeholders[0].key, "memory_safety");

        let seen = judge.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].1.contains("Rust has no GC."));
        assert!(seen[0].1.contains("[[memory_safety]]"));
        assert_eq!(seen[0].2, "_Last updated: 2026-03-01T10:00:00Z_");
    }

    #[tokio::test]
    async fn placeholder_is_filled_without_oracle() {
        let placeholder = placeholder_note("react", "React", "hooks", t(8));
        let judge = CannedMerge::new(None);
        let merged = merger(judge.clone())
            .merge_into_note(
                Some(&placeholder),
                &extract("React", "A UI library.", &["JSX"]),
                &["react".to_string(), "hooks".to_string()],
                t(11),
            )
            .await;

        assert!(merged.content_updated);
        assert!(!merged.note.is_placeholder);
        assert_eq!(merged.note.entity_type, DEFAULT_ENTITY_TYPE);
        assert_eq!(merged.note.related, vec!["hooks", "jsx"]);
        assert!(merged.note.content.starts_with("# React\n\nA UI library."));
        assert!(judge.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn union_is_order_stable() {
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "z".to_string(), "x".to_string()];
        assert_eq!(union_links(&a, &b), vec!["x", "y", "z"]);
    }

    #[test]
    fn reshape_keeps_prose_that_looks_like_a_marker() {
        let merged = "# Rust\n\nUpdated: the API changed in 1.70.\n\nGenerated on demand by macros.\n\n\
                      Generated on 2026-02-01\n\n_Last updated: 2026-02-01T09:00:00Z_";
        let out = reshape_merged("# Rust\n\nold", "Rust", merged, &[], t(12));
        assert_eq!(
            out,
            "# Rust\n\nUpdated: the API changed in 1.70.\n\nGenerated on demand by macros.\n\n\
             _Last updated: 2026-03-01T12:00:00Z_"
        );
    }

    #[test]
    fn marker_needs_a_date() {
        assert!(is_marker("_Last updated: 2026-03-01T10:00:00Z_"));
        assert!(is_marker("**Last updated:** 2026-03-01"));
        assert!(is_marker("Generated on 2024-01-01"));
        assert!(!is_marker("Last updated: never"));
        assert!(!is_marker("Updated: the API changed"));
        assert!(!is_marker("Generated on demand"));
    }

    #[test]
    fn reshape_prepends_missing_title() {
        let out = reshape_merged("# Rust\n\nold", "Rust", "Only body text.", &[], t(12));
        assert_eq!(out, "# Rust\n\nOnly body text.\n\n_Last updated: 2026-03-01T12:00:00Z_");
    }
}
