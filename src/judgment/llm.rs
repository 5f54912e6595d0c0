//! [`JudgmentProvider`] backed by an OpenAI-compatible chat completion endpoint
//! (`POST {base_url}/chat/completions`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{parse, prompts, JudgmentProvider};
use crate::config::JudgmentConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::memory::types::TopicExtract;

const PROVIDER: &str = "judgment";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmJudge {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl LlmJudge {
    pub fn new(config: &JudgmentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: crate::config::read_api_key(&config.api_key_env),
        })
    }

    /// One system + user round trip. Returns the assistant text.
    async fn complete(&self, system: &str, user: &str) -> MemoryResult<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
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

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::unavailable(PROVIDER, format!("bad response body: {e}")))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MemoryError::unavailable(PROVIDER, "response contained no choices"))
    }
}

#[async_trait]
impl JudgmentProvider for LlmJudge {
    async fn extract_topic(&self, query: &str, response: &str) -> MemoryResult<TopicExtract> {
        let answer = self
            .complete(prompts::EXTRACT_SYSTEM, &prompts::extract_topic(query, response))
            .await?;
        parse::topic_extract(&answer)
    }

    async fn pick_similar_title(
        &self,
        candidate: &str,
        existing: &[String],
    ) -> MemoryResult<Option<String>> {
        let answer = self
            .complete(
                prompts::PICK_SYSTEM,
                &prompts::pick_similar_title(candidate, existing),
            )
            .await?;
        Ok(parse::picked_title(&answer))
    }

    async fn merge_content(
        &self,
        existing_markdown: &str,
        new_info: &str,
        update_marker: &str,
    ) -> MemoryResult<String> {
        let answer = self
            .complete(
                prompts::MERGE_SYSTEM,
                &prompts::merge_content(existing_markdown, new_info, update_marker),
            )
            .await?;
        Ok(parse::merged_markdown(&answer))
    }
}
