use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ctxrag_config::{EmbeddingConfig, LlmConfig};

use crate::errors::{ApiError, ApiResult};

/// Sentence embedded once at startup to discover the vector dimension
pub const PROBE_SENTENCE: &str = "This is a test sentence.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Text completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        history: &[ChatMessage],
    ) -> ApiResult<String>;
}

/// Embedding backend; one vector per input text, in order
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, texts: &[String]) -> ApiResult<Vec<Vec<f32>>>;
}

/// Embedding client bundled with its vector dimension and input limit
#[derive(Clone)]
pub struct EmbeddingFunc {
    pub embedding_dim: usize,
    pub max_token_size: usize,
    pub client: Arc<dyn EmbeddingClient>,
}

impl EmbeddingFunc {
    /// Embed [`PROBE_SENTENCE`] and take the dimension from the result
    pub async fn probe(client: Arc<dyn EmbeddingClient>, max_token_size: usize) -> ApiResult<Self> {
        let vectors = client.embed(&[PROBE_SENTENCE.to_string()]).await?;
        let embedding_dim = vectors
            .first()
            .map(Vec::len)
            .filter(|dim| *dim > 0)
            .ok_or_else(|| ApiError::Remote("Embedding probe returned no vector".to_string()))?;

        tracing::info!("📐 Embedding dimension: {}", embedding_dim);
        Ok(Self {
            embedding_dim,
            max_token_size,
            client,
        })
    }

    pub async fn embed(&self, texts: &[String]) -> ApiResult<Vec<Vec<f32>>> {
        self.client.embed(texts).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions client for any OpenAI-compatible gateway
pub struct OpenAiCompatibleLlm {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatibleLlm {
    pub fn new(config: LlmConfig) -> Self {
        tracing::info!("🤖 LLM model {} via {}", config.model, config.base_url);
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleLlm {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        history: &[ChatMessage],
    ) -> ApiResult<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage::new("system", system));
        }
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::new("user", prompt));

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .json(&ChatCompletionRequest {
                model: &self.config.model,
                messages,
            });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Remote(format!("LLM API error: {} - {}", status, error_text)));
        }

        let body: ChatCompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ApiError::Remote("LLM returned no choices".to_string()))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// `/embeddings` client for any OpenAI-compatible gateway
pub struct OpenAiCompatibleEmbedding {
    client: Client,
    config: EmbeddingConfig,
}

impl OpenAiCompatibleEmbedding {
    pub fn new(config: EmbeddingConfig) -> Self {
        tracing::info!("🔢 Embedding model {} via {}", config.model, config.base_url);
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiCompatibleEmbedding {
    async fn embed(&self, texts: &[String]) -> ApiResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.config.base_url.trim_end_matches('/')))
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: texts,
            });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Remote(format!("Embedding API error: {} - {}", status, error_text)));
        }

        let mut body: EmbeddingResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(ApiError::Remote(format!(
                "Embedding API returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
