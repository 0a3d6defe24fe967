use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File holding a context's metadata record
pub const METADATA_FILE: &str = "metadata.json";

/// File holding a context's prompt set
pub const PROMPTS_FILE: &str = "prompts.json";

/// Engine artifacts reported by the generated-files listing, in listing order
pub const GENERATED_FILES: [&str; 6] = [
    "kv_store_full_docs.json",
    "kv_store_text_chunks.json",
    "kv_store_llm_response_cache.json",
    "vdb_chunks.json",
    "vdb_entities.json",
    "vdb_relationships.json",
];

/// Persisted metadata of a context, also returned by the API as-is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextMetadata {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl ContextMetadata {
    /// Build metadata for a brand new context with a fresh id
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            created_at: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateContextRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextList {
    pub contexts: Vec<ContextMetadata>,
}

/// `?context_id=` selector used by the context-scoped endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ContextQuery {
    pub context_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisualizeQuery {
    pub context_id: String,
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFiles {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
}

/// Returns true when `id` can only name a direct child of the storage root
pub fn is_plain_component(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains('/')
        && !id.contains('\\')
        && !id.contains('\0')
}
