//! Text-generation oracle used for the three narrow judgment tasks: topic
//! extraction, same-concept title matching, and note content merging.
//!
//! The core treats every answer as untrusted. Shape checks happen here
//! (see [`parse`]); membership and merge-policy checks happen in the
//! resolver and merger.

pub mod llm;
pub mod parse;
pub mod prompts;

use async_trait::async_trait;

use crate::error::MemoryResult;
use crate::memory::types::TopicExtract;

#[async_trait]
pub trait JudgmentProvider: Send + Sync {
    /// Summarize one conversation turn into a candidate note.
    async fn extract_topic(&self, query: &str, response: &str) -> MemoryResult<TopicExtract>;

    /// Pick the existing title naming the same concept as `candidate`.
    /// `Ok(None)` is the explicit "no match" answer. The returned string is
    /// not guaranteed to be one of `existing`.
    async fn pick_similar_title(
        &self,
        candidate: &str,
        existing: &[String],
    ) -> MemoryResult<Option<String>>;

    /// Merge `new_info` into `existing_markdown`. May return an empty string.
    async fn merge_content(
        &self,
        existing_markdown: &str,
        new_info: &str,
        update_marker: &str,
    ) -> MemoryResult<String>;
}

pub use llm::LlmJudge;
