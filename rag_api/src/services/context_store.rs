use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use ctxrag_models::{is_plain_component, ContextMetadata, PromptSet, METADATA_FILE, PROMPTS_FILE};

use crate::errors::{ApiError, ApiResult};

/// Filesystem-backed registry of contexts under one root directory.
///
/// Each context is a directory named by its id holding `metadata.json`,
/// `prompts.json` and whatever the RAG engine writes there.
#[derive(Clone)]
pub struct ContextStore {
    root: PathBuf,
    template: Arc<PromptSet>,
}

impl ContextStore {
    pub fn new(root: impl Into<PathBuf>, template: PromptSet) -> Self {
        Self {
            root: root.into(),
            template: Arc::new(template),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Prompt set copied into every new context
    pub fn template(&self) -> &PromptSet {
        &self.template
    }

    /// Create the root directory if it does not exist yet
    pub async fn ensure_root(&self) -> ApiResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub async fn create(&self, name: &str, description: Option<String>) -> ApiResult<ContextMetadata> {
        let meta = ContextMetadata::new(name, description);
        let dir = self.root.join(&meta.id);
        fs::create_dir_all(&dir).await?;

        fs::write(dir.join(PROMPTS_FILE), serde_json::to_vec_pretty(self.template())?).await?;
        fs::write(dir.join(METADATA_FILE), serde_json::to_vec(&meta)?).await?;

        tracing::info!("✅ Created context {} ({})", meta.id, meta.name);
        Ok(meta)
    }

    /// Every subdirectory carrying a metadata file, in directory order
    pub async fn list(&self) -> ApiResult<Vec<ContextMetadata>> {
        let mut contexts = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let meta_path = entry.path().join(METADATA_FILE);
            if fs::try_exists(&meta_path).await? {
                let raw = fs::read(&meta_path).await?;
                contexts.push(serde_json::from_slice(&raw)?);
            }
        }

        Ok(contexts)
    }

    pub async fn get(&self, id: &str) -> ApiResult<ContextMetadata> {
        let path = self.dir(id).await?.join(METADATA_FILE);
        if !fs::try_exists(&path).await? {
            return Err(ApiError::context_not_found());
        }
        let raw = fs::read(&path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.dir(id).await.is_ok()
    }

    /// Directory of an existing context
    pub async fn dir(&self, id: &str) -> ApiResult<PathBuf> {
        if !is_plain_component(id) {
            return Err(ApiError::context_not_found());
        }
        let dir = self.root.join(id);
        if fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            Ok(dir)
        } else {
            Err(ApiError::context_not_found())
        }
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let dir = self.dir(id).await?;
        fs::remove_dir_all(&dir).await?;
        tracing::info!("🗑️ Deleted context {}", id);
        Ok(())
    }

    /// Remove engine data from a context, keeping its metadata and prompts
    pub async fn clear(&self, id: &str) -> ApiResult<()> {
        let dir = self.dir(id).await?;
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name == METADATA_FILE || name == PROMPTS_FILE {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
            } else {
                fs::remove_file(entry.path()).await?;
            }
        }

        tracing::info!("🧹 Cleared data of context {}", id);
        Ok(())
    }

    /// Remove the regular files sitting directly in the root; context
    /// directories are left alone
    pub async fn clear_root(&self) -> ApiResult<()> {
        if !fs::try_exists(&self.root).await? {
            return Ok(());
        }

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Err(e) = fs::remove_file(entry.path()).await {
                    tracing::warn!("⚠️ Failed to remove {}: {}", entry.path().display(), e);
                }
            }
        }
        Ok(())
    }
}
