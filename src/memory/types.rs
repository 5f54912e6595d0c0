//! Core record types.
//!
//! [`InteractionRecord`] is a stored conversation turn, [`Note`] a synthesized
//! topic note, [`TopicExtract`] the oracle's summary of one turn, and
//! [`RelevantContext`] what retrieval hands back for prompt augmentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity type given to notes when the extraction does not name one.
pub const DEFAULT_ENTITY_TYPE: &str = "topic";

/// Entity type of placeholder notes created to satisfy a cross-reference.
pub const PLACEHOLDER_ENTITY_TYPE: &str = "concept";

/// Build the text that gets embedded for a turn.
pub fn combined_text(query: &str, response: &str) -> String {
    format!("User: {query}\nAI: {response}")
}

/// A conversation turn about to be appended.
///
/// `id` and `timestamp` are assigned by the store when absent.
#[derive(Debug, Clone, Default)]
pub struct NewInteraction {
    pub id: Option<String>,
    pub query_text: String,
    pub response_text: String,
    pub embedding: Option<Vec<f32>>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewInteraction {
    pub fn new(query_text: impl Into<String>, response_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            response_text: response_text.into(),
            ..Self::default()
        }
    }

    pub fn with_embedding(mut self, embedding: Option<Vec<f32>>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn combined_text(&self) -> String {
        combined_text(&self.query_text, &self.response_text)
    }
}

/// A stored conversation turn. Never mutated after append.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    /// UUID v7 (time-sortable).
    pub id: String,
    pub query_text: String,
    pub response_text: String,
    /// `"User: …\nAI: …"`; the embedding input.
    pub combined_text: String,
    /// `None` if embedding failed at write time, or the stored blob was unreadable.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub timestamp: DateTime<Utc>,
}

/// A contributing snippet kept for audit and future re-merge. Carries the
/// whole extract, so an aborted merge still keeps the related concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContext {
    pub text: String,
    /// Primary topic as the extract named it, before normalization.
    #[serde(default)]
    pub topic: String,
    /// Related concept labels from the extract, in extract order.
    #[serde(default)]
    pub related: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl RawContext {
    pub fn from_extract(extract: &TopicExtract, captured_at: DateTime<Utc>) -> Self {
        Self {
            text: extract.summary.clone(),
            topic: extract.primary_topic.clone(),
            related: extract.related_concepts.clone(),
            captured_at,
        }
    }
}

/// A topic note. `key` is the normalized title and is unique in the store.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub key: String,
    /// Human-readable title.
    pub title: String,
    pub entity_type: String,
    /// Rendered Markdown body.
    pub content: String,
    pub raw_contexts: Vec<RawContext>,
    /// Keys of linked notes, deduplicated, in first-seen order.
    pub related: Vec<String>,
    pub is_placeholder: bool,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Listing row for a note.
#[derive(Debug, Clone, Serialize)]
pub struct NoteSummary {
    pub key: String,
    pub title: String,
    pub entity_type: String,
    pub is_placeholder: bool,
    pub link_count: usize,
    pub last_updated: DateTime<Utc>,
}

/// Structured summary of one turn, as produced by the judgment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicExtract {
    pub primary_topic: String,
    pub entity_type: Option<String>,
    pub summary: String,
    pub related_concepts: Vec<String>,
}

/// The single prior turn judged relevant to a query.
#[derive(Debug, Clone, Serialize)]
pub struct RelevantContext {
    pub interaction_id: String,
    /// Combined text of the turn, capped with a truncation marker.
    pub text: String,
    pub similarity: f64,
    pub topic: String,
    pub truncated: bool,
}

impl RelevantContext {
    /// Render as a preamble for the augmented prompt.
    pub fn to_prompt_preamble(&self) -> String {
        format!(
            "Relevant context from an earlier conversation (topic: {}, similarity: {:.2}):\n{}",
            self.topic, self.similarity, self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_text_convention() {
        assert_eq!(combined_text("hi", "hello"), "User: hi\nAI: hello");
        assert_eq!(
            NewInteraction::new("q", "r").combined_text(),
            "User: q\nAI: r"
        );
    }

    #[test]
    fn preamble_mentions_topic_and_score() {
        let ctx = RelevantContext {
            interaction_id: "id".into(),
            text: "User: a\nAI: b".into(),
            similarity: 0.8234,
            topic: "a".into(),
            truncated: false,
        };
        let preamble = ctx.to_prompt_preamble();
        assert!(preamble.contains("topic: a"));
        assert!(preamble.contains("similarity: 0.82"));
        assert!(preamble.ends_with("User: a\nAI: b"));
    }
}
