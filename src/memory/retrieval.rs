//! Best-effort lookup of the single prior turn most relevant to a query.
//!
//! Every failure along the way (store read, embedding call, timeout) yields
//! `None` and a `warn!` line. A best match at or below the threshold is also
//! `None`: a weak match is never passed off as relevant memory.

use std::sync::Arc;
use std::time::Duration;

use super::interactions::InteractionStore;
use super::similarity::cosine_similarity;
use super::truncate_chars;
use super::types::{InteractionRecord, RelevantContext};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::bounded;

/// Appended to context text that was cut at `context_max_chars`.
pub const TRUNCATION_MARKER: &str = "… [truncated]";

pub struct RetrievalEngine {
    interactions: Arc<dyn InteractionStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    threshold: f64,
    context_max_chars: usize,
    topic_max_chars: usize,
}

impl RetrievalEngine {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RetrievalConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            interactions,
            embedder,
            timeout,
            threshold: config.similarity_threshold,
            context_max_chars: config.context_max_chars,
            topic_max_chars: config.topic_max_chars,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Find the stored turn most similar to `query`, if it clears the threshold.
    pub async fn retrieve(&self, query: &str) -> Option<RelevantContext> {
        let store = Arc::clone(&self.interactions);
        let records = match tokio::task::spawn_blocking(move || store.all_records()).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "retrieval skipped, interaction store unreadable");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "retrieval skipped, store task failed");
                return None;
            }
        };
        if records.is_empty() {
            return None;
        }

        let query_embedding = match bounded("embedding", self.timeout, self.embedder.embed(query)).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "retrieval skipped, query could not be embedded");
                return None;
            }
        };

        let (record, similarity) = best_match(&query_embedding, &records)?;
        if similarity <= self.threshold {
            tracing::debug!(
                best = similarity,
                threshold = self.threshold,
                "no stored turn above relevance threshold"
            );
            return None;
        }

        let (text, truncated) = truncate_chars(&record.combined_text, self.context_max_chars, TRUNCATION_MARKER);
        let (topic, _) = truncate_chars(record.query_text.trim(), self.topic_max_chars, "…");

        tracing::info!(id = %record.id, similarity, truncated, "relevant context found");

        Some(RelevantContext {
            interaction_id: record.id.clone(),
            text,
            similarity,
            topic,
            truncated,
        })
    }
}

/// Highest-scoring record whose embedding matches the query's dimension.
/// Ties go to the most recent timestamp. Records without an embedding are
/// skipped.
pub fn best_match<'a>(
    query: &[f32],
    records: &'a [InteractionRecord],
) -> Option<(&'a InteractionRecord, f64)> {
    let mut best: Option<(&InteractionRecord, f64)> = None;

    for record in records {
        let Some(embedding) = record.embedding.as_deref() else {
            continue;
        };
        if embedding.len() != query.len() {
            continue;
        }

        let score = cosine_similarity(query, embedding);
        let better = match best {
            None => true,
            Some((current, current_score)) => {
                score > current_score || (score == current_score && record.timestamp > current.timestamp)
            }
        };
        if better {
            best = Some((record, score));
        }
    }

    best
}
