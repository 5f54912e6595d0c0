//! OpenAI-compatible embedding endpoint (`POST {base_url}/embeddings`).
//!
//! Works against OpenAI, Ollama's `/v1` shim, LM Studio and similar servers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, MemoryResult};

const PROVIDER: &str = "embedding";

pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: crate::config::read_api_key(&config.api_key_env),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MemoryError::unavailable(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MemoryError::unavailable(
                PROVIDER,
                format!("HTTP {status} from {}", self.endpoint),
            ));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::unavailable(PROVIDER, format!("bad response body: {e}")))?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MemoryError::unavailable(PROVIDER, "response contained no vectors"))?;

        if vector.is_empty() {
            return Err(MemoryError::unavailable(PROVIDER, "empty vector"));
        }

        tracing::debug!(dims = vector.len(), "text embedded");
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
