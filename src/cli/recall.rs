use anyhow::Result;
use std::sync::{Arc, Mutex};

use secondbrain::config::BrainConfig;
use secondbrain::embedding::EmbeddingProvider;
use secondbrain::memory::interactions::SqliteInteractionStore;
use secondbrain::memory::retrieval::RetrievalEngine;

/// Show what `augment` would inject for `query`.
pub async fn recall(config: &BrainConfig, query: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = secondbrain::db::open_database(&db_path)?;
    let store = Arc::new(SqliteInteractionStore::new(Arc::new(Mutex::new(conn))));

    let provider = secondbrain::embedding::create_provider(&config.embedding)?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(provider);

    let engine = RetrievalEngine::new(store, embedder, &config.retrieval, config.embedding.timeout());

    match engine.retrieve(query).await {
        Some(ctx) => {
            println!(
                "Match {} (similarity {:.4}, threshold {:.2}){}\n",
                ctx.interaction_id,
                ctx.similarity,
                engine.threshold(),
                if ctx.truncated { ", truncated" } else { "" }
            );
            println!("{}", ctx.to_prompt_preamble());
        }
        None => println!(
            "No earlier turn above the {:.2} relevance threshold.",
            engine.threshold()
        ),
    }

    Ok(())
}
