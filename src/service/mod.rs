//! Caller-facing memory operations.
//!
//! [`MemoryService`] is what the chat layer talks to: [`augment`](MemoryService::augment)
//! before generating a response, [`record_turn`](MemoryService::record_turn) after.
//! Every collaborator is passed in by the composition root.

pub mod worker;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::config::{BrainConfig, RetrievalConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{bounded, MemoryError, MemoryResult};
use crate::judgment::JudgmentProvider;
use crate::memory::interactions::InteractionStore;
use crate::memory::notes::NoteStore;
use crate::memory::resolver::normalize_title;
use crate::memory::retrieval::RetrievalEngine;
use crate::memory::types::{InteractionRecord, NewInteraction, Note, NoteSummary, RelevantContext};
use worker::{NoteJob, NoteJobFailure, NotePipeline, NoteQueue};

/// Tunables for [`MemoryService`], usually taken from [`BrainConfig`].
#[derive(Debug, Clone)]
pub struct MemorySettings {
    pub retrieval: RetrievalConfig,
    pub embedding_timeout: Duration,
    pub judgment_timeout: Duration,
    pub title_max_len: usize,
    pub queue_capacity: usize,
}

impl MemorySettings {
    pub fn from_config(config: &BrainConfig) -> Self {
        Self {
            retrieval: config.retrieval.clone(),
            embedding_timeout: config.embedding.timeout(),
            judgment_timeout: config.judgment.timeout(),
            title_max_len: config.notes.title_max_len,
            queue_capacity: config.notes.queue_capacity,
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::from_config(&BrainConfig::default())
    }
}

pub struct MemoryService {
    interactions: Arc<dyn InteractionStore>,
    notes: Arc<dyn NoteStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    retrieval: RetrievalEngine,
    queue: NoteQueue,
    failures: Mutex<Option<mpsc::UnboundedReceiver<NoteJobFailure>>>,
    settings: MemorySettings,
}

impl MemoryService {
    /// Build the service and start its note worker. Must be called inside a
    /// tokio runtime.
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        notes: Arc<dyn NoteStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        judge: Arc<dyn JudgmentProvider>,
        settings: MemorySettings,
    ) -> Self {
        let retrieval = RetrievalEngine::new(
            Arc::clone(&interactions),
            Arc::clone(&embedder),
            &settings.retrieval,
            settings.embedding_timeout,
        );
        let pipeline = NotePipeline::new(
            Arc::clone(&notes),
            judge,
            settings.judgment_timeout,
            settings.title_max_len,
        );
        let (queue, failures) = NoteQueue::spawn(pipeline, settings.queue_capacity);

        Self {
            interactions,
            notes,
            embedder,
            retrieval,
            queue,
            failures: Mutex::new(Some(failures)),
            settings,
        }
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Most relevant earlier turn, if any clears the threshold.
    pub async fn retrieve(&self, query: &str) -> Option<RelevantContext> {
        self.retrieval.retrieve(query).await
    }

    /// Context preamble for `query`, or an empty string.
    pub async fn augment(&self, query: &str) -> String {
        self.retrieve(query)
            .await
            .map(|ctx| ctx.to_prompt_preamble())
            .unwrap_or_default()
    }

    /// Persist a finished turn and queue it for note synthesis.
    ///
    /// Only a failed append is returned. Embedding failures store the turn
    /// without a vector; a full or closed note queue is logged.
    pub async fn record_turn(&self, query: &str, response: &str) -> MemoryResult<InteractionRecord> {
        let record = self.append_turn(query, response, None).await?;
        if let Err(e) = self.queue.try_enqueue(job_for(&record)) {
            tracing::warn!(id = %record.id, error = %e, "note job dropped");
        }
        Ok(record)
    }

    /// Like [`record_turn`](Self::record_turn) but keeps the caller's timestamp
    /// and waits for queue space instead of dropping the note job.
    pub async fn ingest_turn(
        &self,
        query: &str,
        response: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> MemoryResult<InteractionRecord> {
        let record = self.append_turn(query, response, timestamp).await?;
        if let Err(e) = self.queue.enqueue(job_for(&record)).await {
            tracing::warn!(id = %record.id, error = %e, "note job dropped");
        }
        Ok(record)
    }

    async fn append_turn(
        &self,
        query: &str,
        response: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> MemoryResult<InteractionRecord> {
        let mut new = NewInteraction::new(query, response);
        new.timestamp = timestamp;

        let combined = new.combined_text();
        let embedding = match bounded(
            "embedding",
            self.settings.embedding_timeout,
            self.embedder.embed(&combined),
        )
        .await
        {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "turn stored without embedding");
                None
            }
        };
        let new = new.with_embedding(embedding);

        let interactions = Arc::clone(&self.interactions);
        let record = run_blocking(move || interactions.append(new)).await?;
        tracing::info!(id = %record.id, embedded = record.embedding.is_some(), "turn recorded");
        Ok(record)
    }

    /// Look a note up by title or key.
    pub async fn get_note(&self, title: &str) -> MemoryResult<Option<Note>> {
        let key = normalize_title(title, self.settings.title_max_len);
        let notes = Arc::clone(&self.notes);
        run_blocking(move || notes.get(&key)).await
    }

    pub async fn list_notes(&self) -> MemoryResult<Vec<NoteSummary>> {
        let notes = Arc::clone(&self.notes);
        run_blocking(move || notes.list()).await
    }

    pub async fn backlinks(&self, key: &str) -> MemoryResult<Vec<String>> {
        let notes = Arc::clone(&self.notes);
        let key = key.to_string();
        run_blocking(move || notes.backlinks(&key)).await
    }

    /// Take the note failure channel. Returns `None` after the first call.
    pub fn take_failures(&self) -> Option<mpsc::UnboundedReceiver<NoteJobFailure>> {
        self.failures.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Stop the note worker after it finishes every queued job.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}

fn job_for(record: &InteractionRecord) -> NoteJob {
    NoteJob {
        id: record.id.clone(),
        query: record.query_text.clone(),
        response: record.response_text.clone(),
        captured_at: record.timestamp,
    }
}

/// Run synchronous store work off the async threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> MemoryResult<T>
where
    F: FnOnce() -> MemoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MemoryError::persistence(format!("store task failed: {e}")))?
}
