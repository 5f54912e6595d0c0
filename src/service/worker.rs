//! Background note pipeline.
//!
//! Each recorded turn becomes a [`NoteJob`] on a bounded queue. A single
//! worker task drains the queue in order: extract a topic, resolve it against
//! existing notes, merge, commit. Jobs never report back to the caller that
//! queued them; failures go to a separate [`NoteJobFailure`] channel and the log.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::run_blocking;
use crate::error::{bounded, MemoryError, MemoryResult};
use crate::judgment::JudgmentProvider;
use crate::memory::merger::NoteMerger;
use crate::memory::notes::NoteStore;
use crate::memory::resolver::{NoteResolver, Resolution};

/// One turn waiting to be folded into the notes.
#[derive(Debug, Clone)]
pub struct NoteJob {
    /// Id of the interaction this job was created for.
    pub id: String,
    pub query: String,
    pub response: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NoteJobFailure {
    pub job_id: String,
    pub error: MemoryError,
}

/// What a successful job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteOutcome {
    pub key: String,
    /// `true` when no existing note matched.
    pub created: bool,
    pub content_updated: bool,
    pub placeholders: usize,
}

pub struct NotePipeline {
    notes: Arc<dyn NoteStore>,
    judge: Arc<dyn JudgmentProvider>,
    resolver: NoteResolver,
    merger: NoteMerger,
    timeout: Duration,
}

impl NotePipeline {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        judge: Arc<dyn JudgmentProvider>,
        timeout: Duration,
        title_max_len: usize,
    ) -> Self {
        Self {
            resolver: NoteResolver::new(Arc::clone(&judge), timeout, title_max_len),
            merger: NoteMerger::new(Arc::clone(&judge), timeout, title_max_len),
            notes,
            judge,
            timeout,
        }
    }

    /// Run one job to completion.
    pub async fn process(&self, job: &NoteJob) -> MemoryResult<NoteOutcome> {
        let extract = bounded(
            "judgment",
            self.timeout,
            self.judge.extract_topic(&job.query, &job.response),
        )
        .await?;
        if extract.primary_topic.trim().is_empty() {
            return Err(MemoryError::MalformedJudgmentOutput(
                "extraction has an empty primary topic".into(),
            ));
        }

        let notes = Arc::clone(&self.notes);
        let keys = run_blocking(move || notes.keys()).await?;

        let resolution = self.resolver.resolve(&extract.primary_topic, &keys).await;
        let existing = match resolution.matched() {
            Some(key) => {
                let notes = Arc::clone(&self.notes);
                let key = key.to_string();
                run_blocking(move || notes.get(&key)).await?
            }
            None => None,
        };

        let merged = self
            .merger
            .merge_into_note(existing.as_ref(), &extract, &keys, job.captured_at)
            .await;

        let outcome = NoteOutcome {
            key: merged.note.key.clone(),
            created: existing.is_none(),
            content_updated: merged.content_updated,
            placeholders: merged.placeholders.len(),
        };

        let notes = Arc::clone(&self.notes);
        run_blocking(move || notes.commit_merge(&merged)).await?;

        tracing::info!(
            job = %job.id,
            key = %outcome.key,
            created = outcome.created,
            exact = matches!(resolution, Resolution::Exact(_)),
            content_updated = outcome.content_updated,
            placeholders = outcome.placeholders,
            "note updated"
        );
        Ok(outcome)
    }
}

/// Handle to the running note worker.
pub struct NoteQueue {
    sender: mpsc::Sender<NoteJob>,
    worker: JoinHandle<()>,
}

impl NoteQueue {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(
        pipeline: NotePipeline,
        capacity: usize,
    ) -> (Self, mpsc::UnboundedReceiver<NoteJobFailure>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(pipeline, receiver, failures_tx));
        (Self { sender, worker }, failures_rx)
    }

    /// Queue a job without waiting. Fails if the queue is full or closed.
    pub fn try_enqueue(&self, job: NoteJob) -> Result<(), mpsc::error::TrySendError<NoteJob>> {
        self.sender.try_send(job)
    }

    /// Queue a job, waiting for space.
    pub async fn enqueue(&self, job: NoteJob) -> Result<(), mpsc::error::SendError<NoteJob>> {
        self.sender.send(job).await
    }

    /// Stop accepting jobs and wait for the queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "note worker panicked");
        }
    }
}

async fn run_worker(
    pipeline: NotePipeline,
    mut jobs: mpsc::Receiver<NoteJob>,
    failures: mpsc::UnboundedSender<NoteJobFailure>,
) {
    tracing::debug!("note worker started");
    while let Some(job) = jobs.recv().await {
        if let Err(error) = pipeline.process(&job).await {
            tracing::warn!(job = %job.id, error = %error, "note job failed, knowledge base not updated");
            // Nobody listening is fine.
            let _ = failures.send(NoteJobFailure {
                job_id: job.id,
                error,
            });
        }
    }
    tracing::debug!("note worker stopped");
}
