//! Text-to-vector embedding.
//!
//! The core only consumes vectors; how they are produced is up to the
//! [`EmbeddingProvider`] handed in by the composition root. [`create_provider`]
//! builds the configured implementation.

pub mod http;

use async_trait::async_trait;

use crate::error::MemoryResult;

/// Converts text into a fixed-length vector.
///
/// Implementations report failures as
/// [`MemoryError::ProviderUnavailable`](crate::error::MemoryError::ProviderUnavailable).
/// Callers bound every call with a timeout.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>>;

    /// Identifier recorded alongside stored vectors.
    fn model_name(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// Currently only `"http"` (OpenAI-compatible `/embeddings`) is supported.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "http" => Ok(Box::new(http::HttpEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: http"),
    }
}
