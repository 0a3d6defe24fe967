use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;

use ctxrag_models::{PromptSet, QueryParam};

use super::llm::{EmbeddingFunc, LlmClient};
use crate::errors::ApiResult;

/// A retrieval-augmented generation engine bound to one working directory
#[async_trait]
pub trait RagEngine: Send + Sync {
    /// Index a document
    async fn insert(&self, text: &str) -> ApiResult<()>;

    /// Answer `query` with the retrieval strategy in `param`
    async fn query(&self, query: &str, param: QueryParam) -> ApiResult<String>;

    /// Answer `query` once per entry of `params`, concurrently. The first
    /// failure fails the whole call; answers keep the order of `params`.
    async fn query_modes(&self, query: &str, params: &[QueryParam]) -> ApiResult<Vec<String>> {
        try_join_all(params.iter().map(|param| self.query(query, *param))).await
    }
}

/// Everything an engine is constructed from. Prompts are bound at build
/// time, so a prompt change requires a rebuild.
#[derive(Clone)]
pub struct EngineSettings {
    pub working_dir: PathBuf,
    pub prompts: PromptSet,
    pub llm: Arc<dyn LlmClient>,
    pub embedding: EmbeddingFunc,
}

#[async_trait]
pub trait RagEngineFactory: Send + Sync {
    async fn build(&self, settings: EngineSettings) -> ApiResult<Arc<dyn RagEngine>>;
}
