//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! [`setup_shared_state`] is also the composition root for the CLI commands
//! that need a running [`MemoryService`].

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

use secondbrain::config::BrainConfig;
use secondbrain::db;
use secondbrain::embedding::{self, EmbeddingProvider};
use secondbrain::judgment::{JudgmentProvider, LlmJudge};
use secondbrain::memory::interactions::SqliteInteractionStore;
use secondbrain::memory::notes::SqliteNoteStore;
use secondbrain::service::{MemorySettings, MemoryService};

use crate::tools::SecondBrainTools;

/// Everything a running instance shares.
pub struct SharedState {
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub service: MemoryService,
    pub config: Arc<BrainConfig>,
}

/// Open the DB, build both providers, check the embedding model, and start the
/// memory service. Must be called inside a tokio runtime.
pub fn setup_shared_state(config: BrainConfig) -> Result<SharedState> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    match db::migrations::get_embedding_model(&conn)? {
        Some(stored) if stored != config.embedding.model => {
            tracing::warn!(
                stored = %stored,
                configured = %config.embedding.model,
                "embedding model changed, turns embedded with the old model will not match new queries"
            );
        }
        Some(_) => {}
        None => db::migrations::set_embedding_model(&conn, &config.embedding.model)?,
    }

    let db = Arc::new(Mutex::new(conn));

    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(embedding::create_provider(&config.embedding)?);
    tracing::info!(model = %embedder.model_name(), "embedding provider ready");

    let judge: Arc<dyn JudgmentProvider> = Arc::new(LlmJudge::new(&config.judgment)?);
    tracing::info!(model = %config.judgment.model, "judgment provider ready");

    let service = MemoryService::new(
        Arc::new(SqliteInteractionStore::new(Arc::clone(&db))),
        Arc::new(SqliteNoteStore::new(Arc::clone(&db))),
        embedder,
        judge,
        MemorySettings::from_config(&config),
    );

    Ok(SharedState {
        db,
        service,
        config: Arc::new(config),
    })
}

/// Log note-pipeline failures as they arrive, for the lifetime of the server.
fn watch_note_failures(service: &MemoryService) {
    if let Some(mut failures) = service.take_failures() {
        tokio::spawn(async move {
            let mut total = 0u64;
            while let Some(failure) = failures.recv().await {
                total += 1;
                tracing::debug!(job = %failure.job_id, total, "note job failure recorded");
            }
        });
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: BrainConfig) -> Result<()> {
    tracing::info!("starting secondbrain MCP server on stdio");

    let SharedState { db, service, config } = setup_shared_state(config)?;
    watch_note_failures(&service);

    let tools = SecondBrainTools::new(Arc::new(service), db, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: BrainConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting secondbrain MCP server on HTTP");

    let SharedState { db, service, config } = setup_shared_state(config)?;
    watch_note_failures(&service);
    let service = Arc::new(service);

    let mcp = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || {
            Ok(SecondBrainTools::new(
                Arc::clone(&service),
                Arc::clone(&db),
                Arc::clone(&config),
            ))
        },
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
