#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use secondbrain::db;
use secondbrain::embedding::EmbeddingProvider;
use secondbrain::error::{MemoryError, MemoryResult};
use secondbrain::judgment::JudgmentProvider;
use secondbrain::memory::interactions::SqliteInteractionStore;
use secondbrain::memory::notes::SqliteNoteStore;
use secondbrain::memory::types::TopicExtract;
use secondbrain::service::{MemoryService, MemorySettings};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

pub fn shared_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(test_db()))
}

/// Deterministic 64-dim embedding with a spike at position `seed`.
/// Distinct seeds are orthogonal.
pub fn test_embedding(seed: u8) -> Vec<f32> {
    let mut v = vec![0.0f32; 64];
    v[seed as usize % 64] = 1.0;
    v
}

/// Unit vector whose cosine similarity to `test_embedding(seed)` is `sim`.
pub fn embedding_at(seed: u8, sim: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; 64];
    v[seed as usize % 64] = sim;
    v[(seed as usize + 1) % 64] = (1.0 - sim * sim).sqrt();
    v
}

/// Returns a scripted vector per exact input text; anything else fails.
#[derive(Default)]
pub struct ScriptedEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    pub calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, text: &str, vector: Vec<f32>) {
        self.vectors.lock().unwrap().insert(text.to_string(), vector);
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| MemoryError::unavailable("embedding", format!("no vector scripted for {text:?}")))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Judgment fake: extracts by query, answers title picks and merges from script.
#[derive(Default)]
pub struct ScriptedJudge {
    extracts: Mutex<HashMap<String, TopicExtract>>,
    pick: Mutex<Option<String>>,
    merge: Mutex<Option<String>>,
    pub pick_calls: AtomicUsize,
    pub merge_calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn extract(&self, query: &str, topic: &str, summary: &str, related: &[&str]) {
        self.extracts.lock().unwrap().insert(
            query.to_string(),
            TopicExtract {
                primary_topic: topic.to_string(),
                entity_type: None,
                summary: summary.to_string(),
                related_concepts: related.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    /// Answer for every title pick. `None` answers "no match".
    pub fn pick(&self, answer: Option<&str>) {
        *self.pick.lock().unwrap() = answer.map(str::to_string);
    }

    /// Answer for every merge. `None` makes merges fail.
    pub fn merge(&self, answer: Option<&str>) {
        *self.merge.lock().unwrap() = answer.map(str::to_string);
    }
}

#[async_trait]
impl JudgmentProvider for ScriptedJudge {
    async fn extract_topic(&self, query: &str, _response: &str) -> MemoryResult<TopicExtract> {
        self.extracts
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| MemoryError::MalformedJudgmentOutput(format!("no extract for {query:?}")))
    }

    async fn pick_similar_title(&self, _candidate: &str, _existing: &[String]) -> MemoryResult<Option<String>> {
        self.pick_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pick.lock().unwrap().clone())
    }

    async fn merge_content(&self, _existing: &str, _new_info: &str, _marker: &str) -> MemoryResult<String> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        self.merge
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MemoryError::unavailable("judgment", "merge offline"))
    }
}

/// A service over `db` with default settings.
pub fn service(
    db: &Arc<Mutex<Connection>>,
    embedder: Arc<ScriptedEmbedder>,
    judge: Arc<ScriptedJudge>,
) -> MemoryService {
    MemoryService::new(
        Arc::new(SqliteInteractionStore::new(Arc::clone(db))),
        Arc::new(SqliteNoteStore::new(Arc::clone(db))),
        embedder,
        judge,
        MemorySettings::default(),
    )
}

pub fn note_store(db: &Arc<Mutex<Connection>>) -> SqliteNoteStore {
    SqliteNoteStore::new(Arc::clone(db))
}
