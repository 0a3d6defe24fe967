use std::sync::Arc;

use ctxrag_config::AppConfig;

use crate::errors::ApiResult;
use crate::services::{
    load_template, ContextStore, EmbeddingClient, EmbeddingFunc, LlmClient, LocalRagFactory,
    OpenAiCompatibleEmbedding, OpenAiCompatibleLlm, PromptStore, RagEngineFactory, RagRegistry,
};

/// Shared application state handed to every handler
pub struct AppState {
    pub contexts: ContextStore,
    pub prompts: PromptStore,
    pub registry: RagRegistry,
}

impl AppState {
    /// Wire the stores and registry from explicit parts
    pub async fn new(
        contexts: ContextStore,
        factory: Arc<dyn RagEngineFactory>,
        llm: Arc<dyn LlmClient>,
        embedding: EmbeddingFunc,
    ) -> ApiResult<Self> {
        contexts.ensure_root().await?;
        let registry = RagRegistry::new(contexts.clone(), factory, llm, embedding).await?;

        Ok(Self {
            prompts: PromptStore::new(contexts.clone()),
            contexts,
            registry,
        })
    }

    /// Production wiring: OpenAI-compatible clients and the built-in engine.
    /// Probes the embedding dimension once.
    pub async fn from_config(config: &AppConfig) -> ApiResult<Self> {
        let template = load_template(config.prompts_template_path.as_deref()).await?;
        let contexts = ContextStore::new(&config.rag_dir, template);

        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiCompatibleLlm::new(config.llm.clone()));
        let embedding_client: Arc<dyn EmbeddingClient> =
            Arc::new(OpenAiCompatibleEmbedding::new(config.embedding.clone()));
        let embedding = EmbeddingFunc::probe(embedding_client, config.embedding.max_token_size).await?;

        Self::new(contexts, Arc::new(LocalRagFactory), llm, embedding).await
    }
}
