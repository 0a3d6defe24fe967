//! Environment-driven configuration for the ctxrag binaries.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Every setting has a default so a bare `cargo run` starts a server
//! against a local OpenAI-compatible gateway.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_RAG_DIR: &str = "index_default";
pub const DEFAULT_LLM_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";
pub const DEFAULT_EMBEDDING_MODEL: &str = "amazon.titan-embed-text-v2:0";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000/api/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load `.env` if present. Missing files are not an error.
pub fn load_dotenv() {
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_token_size: usize,
}

#[derive(Debug, Clone)]
pub struct GraphDbConfig {
    pub endpoint: String,
    pub port: u16,
}

impl GraphDbConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            endpoint: env::var("NEPTUNE_ENDPOINT").unwrap_or_else(|_| "localhost".to_string()),
            port: parse_var("NEPTUNE_PORT", 8182)?,
        })
    }

    /// Gremlin HTTP endpoint, always over TLS
    pub fn gremlin_url(&self) -> String {
        format!("https://{}:{}/gremlin", self.endpoint, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rag_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub prompts_template_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> ConfigResult<Self> {
        let api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        let llm_base_url =
            env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());

        Ok(Self {
            rag_dir: env::var("RAG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_RAG_DIR)),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8020)?,
            embedding: EmbeddingConfig {
                base_url: env::var("EMBEDDING_BASE_URL").unwrap_or_else(|_| llm_base_url.clone()),
                api_key: env::var("EMBEDDING_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty())
                    .or_else(|| api_key.clone()),
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
                max_token_size: parse_var("EMBEDDING_MAX_TOKEN_SIZE", 8192)?,
            },
            llm: LlmConfig {
                base_url: llm_base_url,
                api_key,
                model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            },
            prompts_template_path: env::var("PROMPTS_TEMPLATE_PATH").ok().map(PathBuf::from),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> ConfigResult<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
