//! Decides whether a newly extracted topic belongs to an existing note.
//!
//! Exact key match first, then an oracle-assisted semantic match whose answer
//! must be one of the offered keys. Any failure resolves to "no match": a
//! spurious new note is cheaper than merging into the wrong one.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::bounded;
use crate::judgment::JudgmentProvider;

/// Key used when a title normalizes to nothing.
pub const UNTITLED_KEY: &str = "untitled";

/// Case-fold, turn whitespace into `_`, drop anything that is not
/// alphanumeric, `_` or `-`, collapse `_` runs, truncate to `max_len`
/// characters (never below the length of [`UNTITLED_KEY`]) and trim
/// separators from the ends. Idempotent.
pub fn normalize_title(title: &str, max_len: usize) -> String {
    let max_len = max_len.max(UNTITLED_KEY.len());
    let mut key = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        let c = if c.is_whitespace() { '_' } else { c };
        if !(c.is_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        if c == '_' && key.ends_with('_') {
            continue;
        }
        key.push(c);
    }

    let truncated: String = key.chars().take(max_len).collect();
    let trimmed = truncated.trim_matches(|c| c == '_' || c == '-');

    if trimmed.is_empty() {
        UNTITLED_KEY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Outcome of [`NoteResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Normalized candidate equals an existing key.
    Exact(String),
    /// The oracle named an offered key as the same concept.
    Semantic(String),
    NoMatch,
}

impl Resolution {
    pub fn matched(&self) -> Option<&str> {
        match self {
            Self::Exact(key) | Self::Semantic(key) => Some(key),
            Self::NoMatch => None,
        }
    }
}

pub struct NoteResolver {
    judge: Arc<dyn JudgmentProvider>,
    timeout: Duration,
    title_max_len: usize,
}

impl NoteResolver {
    pub fn new(judge: Arc<dyn JudgmentProvider>, timeout: Duration, title_max_len: usize) -> Self {
        Self {
            judge,
            timeout,
            title_max_len,
        }
    }

    pub fn normalize(&self, title: &str) -> String {
        normalize_title(title, self.title_max_len)
    }

    /// Match `candidate_title` against `existing_keys`. A returned key is
    /// always a member of `existing_keys`.
    pub async fn resolve(&self, candidate_title: &str, existing_keys: &[String]) -> Resolution {
        let candidate = self.normalize(candidate_title);

        if existing_keys.iter().any(|k| *k == candidate) {
            tracing::debug!(key = %candidate, "exact note match");
            return Resolution::Exact(candidate);
        }
        if existing_keys.is_empty() {
            return Resolution::NoMatch;
        }

        let picked = bounded(
            "judgment",
            self.timeout,
            self.judge.pick_similar_title(&candidate, existing_keys),
        )
        .await;

        match picked {
            Ok(Some(answer)) => {
                let offered: HashSet<&str> = existing_keys.iter().map(String::as_str).collect();
                if offered.contains(answer.as_str()) {
                    tracing::info!(candidate = %candidate, matched = %answer, "semantic note match");
                    Resolution::Semantic(answer)
                } else {
                    tracing::warn!(
                        candidate = %candidate,
                        answer = %answer,
                        "title match not among offered keys, treating as no match"
                    );
                    Resolution::NoMatch
                }
            }
            Ok(None) => Resolution::NoMatch,
            Err(e) => {
                tracing::warn!(candidate = %candidate, error = %e, "semantic title match unavailable");
                Resolution::NoMatch
            }
        }
    }
}
