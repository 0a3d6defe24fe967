use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

use ctxrag_models::{PromptSet, PromptValue, PromptVariable, PROMPTS_FILE};

use super::context_store::ContextStore;
use crate::errors::{ApiError, ApiResult};

/// Template shipped with the service
const BUILTIN_TEMPLATE: &str = include_str!("../../prompts/prompts_template.json");

/// Read the prompt template from `path`, or the built-in one when unset
pub async fn load_template(path: Option<&Path>) -> ApiResult<PromptSet> {
    let template: PromptSet = match path {
        Some(path) => {
            tracing::info!("Loading prompt template from {}", path.display());
            serde_json::from_slice(&fs::read(path).await?)?
        }
        None => serde_json::from_str(BUILTIN_TEMPLATE)?,
    };
    tracing::debug!("Prompt template has {} variables", template.len());
    Ok(template)
}

/// Per-context prompt sets stored as `prompts.json`
#[derive(Clone)]
pub struct PromptStore {
    contexts: ContextStore,
}

impl PromptStore {
    pub fn new(contexts: ContextStore) -> Self {
        Self { contexts }
    }

    async fn path(&self, context_id: &str) -> ApiResult<PathBuf> {
        Ok(self.contexts.dir(context_id).await?.join(PROMPTS_FILE))
    }

    pub async fn load(&self, context_id: &str) -> ApiResult<PromptSet> {
        let raw = fs::read(self.path(context_id).await?).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Overwrite the context's prompt set. Every template key must be present.
    pub async fn save(&self, context_id: &str, prompts: &PromptSet) -> ApiResult<()> {
        let missing = prompts.missing_keys(self.contexts.template());
        if !missing.is_empty() {
            return Err(ApiError::Validation(format!(
                "Prompt set is missing template variables: {}",
                missing.join(", ")
            )));
        }

        fs::write(self.path(context_id).await?, serde_json::to_vec_pretty(prompts)?).await?;
        Ok(())
    }

    /// Set one variable, coercing `value` according to `kind`
    pub async fn update(&self, context_id: &str, variable: &str, kind: &str, value: Value) -> ApiResult<()> {
        let path = self.path(context_id).await?;
        if !fs::try_exists(&path).await? {
            return Err(ApiError::NotFound(format!(
                "Prompts not found for context {}",
                context_id
            )));
        }

        let mut prompts = self.load(context_id).await?;
        prompts.set(variable, PromptValue::from_update(kind, value));
        self.save(context_id, &prompts).await?;

        tracing::info!("✏️ Updated prompt variable {} in context {}", variable, context_id);
        Ok(())
    }

    pub async fn variables(&self, context_id: &str) -> ApiResult<Vec<PromptVariable>> {
        Ok(self.load(context_id).await?.variables())
    }
}
