pub mod context_store;
pub mod llm;
pub mod local_rag;
pub mod prompts;
pub mod rag_engine;
pub mod registry;
pub mod text_decode;
pub mod visualize;

pub use context_store::ContextStore;
pub use llm::{
    ChatMessage, EmbeddingClient, EmbeddingFunc, LlmClient, OpenAiCompatibleEmbedding,
    OpenAiCompatibleLlm,
};
pub use local_rag::LocalRagFactory;
pub use prompts::{load_template, PromptStore};
pub use rag_engine::{EngineSettings, RagEngine, RagEngineFactory};
pub use registry::RagRegistry;
