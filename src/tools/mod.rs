pub mod augment_prompt;
pub mod get_note;
pub mod list_notes;
pub mod memory_stats;
pub mod record_turn;

use augment_prompt::AugmentPromptParams;
use get_note::GetNoteParams;
use list_notes::ListNotesParams;
use memory_stats::MemoryStatsParams;
use record_turn::RecordTurnParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use secondbrain::config::BrainConfig;
use secondbrain::service::MemoryService;

/// The secondbrain MCP tool handler. Holds the shared memory service, the raw
/// connection for stats, and config; exposes every tool via `#[tool_router]`.
#[derive(Clone)]
pub struct SecondBrainTools {
    tool_router: ToolRouter<Self>,
    service: Arc<MemoryService>,
    db: Arc<Mutex<Connection>>,
    config: Arc<BrainConfig>,
}

#[tool_router]
impl SecondBrainTools {
    pub fn new(
        service: Arc<MemoryService>,
        db: Arc<Mutex<Connection>>,
        config: Arc<BrainConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
            db,
            config,
        }
    }

    /// Find earlier context relevant to a new message.
    #[tool(description = "Call before answering a user message. Returns the single most relevant earlier conversation turn as a ready-to-use context preamble, or an empty context when nothing is relevant enough.")]
    async fn augment_prompt(
        &self,
        Parameters(params): Parameters<AugmentPromptParams>,
    ) -> Result<String, String> {
        if params.query.trim().is_empty() {
            return Err("query must not be empty".into());
        }
        tracing::info!(query_len = params.query.len(), "augment_prompt called");

        let body = match self.service.retrieve(&params.query).await {
            Some(ctx) => serde_json::json!({
                "context": ctx.to_prompt_preamble(),
                "interaction_id": ctx.interaction_id,
                "similarity": ctx.similarity,
                "topic": ctx.topic,
                "truncated": ctx.truncated,
            }),
            None => serde_json::json!({
                "context": "",
                "threshold": self.config.retrieval.similarity_threshold,
            }),
        };
        Ok(body.to_string())
    }

    /// Persist a finished turn and queue note synthesis.
    #[tool(description = "Call after answering. Stores the turn (query + response) for future retrieval and updates the topic notes in the background.")]
    async fn record_turn(
        &self,
        Parameters(params): Parameters<RecordTurnParams>,
    ) -> Result<String, String> {
        if params.query.is_empty() && params.response.is_empty() {
            return Err("query and response must not both be empty".into());
        }

        let record = self
            .service
            .record_turn(&params.query, &params.response)
            .await
            .map_err(|e| format!("turn not recorded: {e}"))?;

        Ok(serde_json::json!({
            "id": record.id,
            "timestamp": record.timestamp,
            "embedded": record.embedding.is_some(),
        })
        .to_string())
    }

    /// Read one note with its links.
    #[tool(description = "Read a topic note by title or key. Returns Markdown content, outgoing links, and backlinks.")]
    async fn get_note(
        &self,
        Parameters(params): Parameters<GetNoteParams>,
    ) -> Result<String, String> {
        let note = self
            .service
            .get_note(&params.title)
            .await
            .map_err(|e| format!("lookup failed: {e}"))?
            .ok_or_else(|| format!("no note titled '{}'", params.title))?;

        let backlinks = self
            .service
            .backlinks(&note.key)
            .await
            .map_err(|e| format!("backlink lookup failed: {e}"))?;

        let mut body = serde_json::to_value(&note).map_err(|e| format!("serialization failed: {e}"))?;
        if !params.include_contexts.unwrap_or(false) {
            if let Some(obj) = body.as_object_mut() {
                obj.remove("raw_contexts");
            }
        }
        body["backlinks"] = serde_json::json!(backlinks);
        Ok(body.to_string())
    }

    /// List every note.
    #[tool(description = "List topic notes, most recently updated first, with link counts.")]
    async fn list_notes(
        &self,
        Parameters(params): Parameters<ListNotesParams>,
    ) -> Result<String, String> {
        let include_placeholders = params.include_placeholders.unwrap_or(true);
        let notes: Vec<_> = self
            .service
            .list_notes()
            .await
            .map_err(|e| format!("listing failed: {e}"))?
            .into_iter()
            .filter(|n| include_placeholders || !n.is_placeholder)
            .collect();

        Ok(serde_json::json!({ "notes": notes, "total": notes.len() }).to_string())
    }

    /// Store statistics.
    #[tool(description = "Get memory statistics: interaction counts (with and without embeddings), notes, placeholders, links, and time range.")]
    async fn memory_stats(
        &self,
        Parameters(_params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let db_path = self.config.resolved_db_path();

        let stats = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            secondbrain::memory::stats::memory_stats(&conn, Some(&db_path))
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("stats failed: {e}"))?;

        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for SecondBrainTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "secondbrain is a conversational memory server. Call augment_prompt before \
                 answering a user message and record_turn after. Use get_note and list_notes \
                 to browse the topic notes built from past conversations."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
