use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::context_store::ContextStore;
use super::llm::{EmbeddingFunc, LlmClient};
use super::prompts::PromptStore;
use super::rag_engine::{EngineSettings, RagEngine, RagEngineFactory};
use crate::errors::ApiResult;

/// Owns the engine instances: one memoized per context plus the default
/// instance working on the storage root.
pub struct RagRegistry {
    contexts: ContextStore,
    prompts: PromptStore,
    factory: Arc<dyn RagEngineFactory>,
    llm: Arc<dyn LlmClient>,
    embedding: EmbeddingFunc,
    instances: RwLock<Instances>,
    default: RwLock<Arc<dyn RagEngine>>,
}

/// Memoized engines plus a per-context generation bumped on every
/// invalidation. A build started under an older generation is discarded.
#[derive(Default)]
struct Instances {
    engines: HashMap<String, Arc<dyn RagEngine>>,
    generations: HashMap<String, u64>,
}

impl Instances {
    fn generation(&self, context_id: &str) -> u64 {
        self.generations.get(context_id).copied().unwrap_or(0)
    }
}

impl RagRegistry {
    pub async fn new(
        contexts: ContextStore,
        factory: Arc<dyn RagEngineFactory>,
        llm: Arc<dyn LlmClient>,
        embedding: EmbeddingFunc,
    ) -> ApiResult<Self> {
        let default = factory
            .build(EngineSettings {
                working_dir: contexts.root().to_path_buf(),
                prompts: contexts.template().clone(),
                llm: llm.clone(),
                embedding: embedding.clone(),
            })
            .await?;

        Ok(Self {
            prompts: PromptStore::new(contexts.clone()),
            contexts,
            factory,
            llm,
            embedding,
            instances: RwLock::new(Instances::default()),
            default: RwLock::new(default),
        })
    }

    /// Engine for a context, built with its current prompts on first use
    pub async fn get_instance(&self, context_id: &str) -> ApiResult<Arc<dyn RagEngine>> {
        let working_dir = self.contexts.dir(context_id).await?;

        loop {
            let generation = {
                let instances = self.instances.read().await;
                if let Some(engine) = instances.engines.get(context_id) {
                    return Ok(engine.clone());
                }
                instances.generation(context_id)
            };

            let prompts = self.prompts.load(context_id).await?;
            let engine = self
                .factory
                .build(EngineSettings {
                    working_dir: working_dir.clone(),
                    prompts,
                    llm: self.llm.clone(),
                    embedding: self.embedding.clone(),
                })
                .await?;

            let mut instances = self.instances.write().await;
            if instances.generation(context_id) == generation {
                let engine = instances
                    .engines
                    .entry(context_id.to_string())
                    .or_insert(engine)
                    .clone();
                tracing::debug!("Engine ready for context {}", context_id);
                return Ok(engine);
            }
            tracing::debug!("Context {} invalidated during build, rebuilding", context_id);
        }
    }

    /// Drop the memoized engine; the next request rebuilds it and builds
    /// already in flight are discarded
    pub async fn invalidate(&self, context_id: &str) {
        let mut instances = self.instances.write().await;
        *instances.generations.entry(context_id.to_string()).or_insert(0) += 1;
        if instances.engines.remove(context_id).is_some() {
            tracing::debug!("Invalidated engine for context {}", context_id);
        }
    }

    pub async fn reinitialize(&self, context_id: &str) -> ApiResult<Arc<dyn RagEngine>> {
        self.invalidate(context_id).await;
        self.get_instance(context_id).await
    }

    pub async fn default_instance(&self) -> Arc<dyn RagEngine> {
        self.default.read().await.clone()
    }

    /// Rebuild the default engine over the storage root
    pub async fn replace_default(&self) -> ApiResult<()> {
        let engine = self
            .factory
            .build(EngineSettings {
                working_dir: self.contexts.root().to_path_buf(),
                prompts: self.contexts.template().clone(),
                llm: self.llm.clone(),
                embedding: self.embedding.clone(),
            })
            .await?;
        *self.default.write().await = engine;
        tracing::info!("♻️ Default engine reinitialized");
        Ok(())
    }

    pub async fn cached_count(&self) -> usize {
        self.instances.read().await.engines.len()
    }
}
