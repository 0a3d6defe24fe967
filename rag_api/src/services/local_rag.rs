//! Built-in chunk-vector RAG engine persisting its state as JSON files in
//! the context directory.

use async_trait::async_trait;
use futures_util::future::try_join_all;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use ctxrag_models::{PromptSet, QueryMode, QueryParam};

use super::llm::{EmbeddingFunc, LlmClient};
use super::rag_engine::{EngineSettings, RagEngine, RagEngineFactory};
use crate::errors::{ApiError, ApiResult};

pub const FULL_DOCS_FILE: &str = "kv_store_full_docs.json";
pub const TEXT_CHUNKS_FILE: &str = "kv_store_text_chunks.json";
pub const LLM_CACHE_FILE: &str = "kv_store_llm_response_cache.json";
pub const VDB_CHUNKS_FILE: &str = "vdb_chunks.json";

const CHUNK_TOKEN_SIZE: usize = 1200;
const CHUNK_OVERLAP_TOKENS: usize = 100;
const EMBEDDING_BATCH_SIZE: usize = 32;
const TOP_K: usize = 5;
const TOP_DOCS: usize = 3;
const CHUNK_SEPARATOR: &str = "\n--New Chunk--\n";

const DEFAULT_RESPONSE_TYPE: &str = "Multiple Paragraphs";
const DEFAULT_FAIL_RESPONSE: &str = "Sorry, I'm not able to provide an answer to that question.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FullDoc {
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TextChunk {
    tokens: usize,
    content: String,
    chunk_order_index: usize,
    full_doc_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkVector {
    #[serde(rename = "__id__")]
    id: String,
    content: String,
    full_doc_id: String,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChunkVectors {
    embedding_dim: usize,
    data: Vec<ChunkVector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    mode: String,
    #[serde(rename = "return")]
    response: String,
}

/// Snapshot of the persisted engine state
struct Store {
    docs: IndexMap<String, FullDoc>,
    chunks: IndexMap<String, TextChunk>,
    vectors: ChunkVectors,
}

pub struct LocalRag {
    working_dir: PathBuf,
    prompts: PromptSet,
    llm: Arc<dyn LlmClient>,
    embedding: EmbeddingFunc,
    io_lock: Mutex<()>,
}

impl LocalRag {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            working_dir: settings.working_dir,
            prompts: settings.prompts,
            llm: settings.llm,
            embedding: settings.embedding,
            io_lock: Mutex::new(()),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.working_dir.join(file)
    }

    async fn load_store(&self) -> ApiResult<Store> {
        let _guard = self.io_lock.lock().await;
        Ok(Store {
            docs: read_json(&self.path(FULL_DOCS_FILE)).await?,
            chunks: read_json(&self.path(TEXT_CHUNKS_FILE)).await?,
            vectors: read_json(&self.path(VDB_CHUNKS_FILE)).await?,
        })
    }

    async fn embed_chunks(&self, chunks: &[(String, TextChunk)]) -> ApiResult<Vec<ChunkVector>> {
        let mut out = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBEDDING_BATCH_SIZE) {
            let inputs: Vec<String> = batch
                .iter()
                .map(|(_, chunk)| truncate_tokens(&chunk.content, self.embedding.max_token_size))
                .collect();
            let vectors = self.embedding.embed(&inputs).await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::Remote(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            out.extend(batch.iter().zip(vectors).map(|((id, chunk), vector)| ChunkVector {
                id: id.clone(),
                content: chunk.content.clone(),
                full_doc_id: chunk.full_doc_id.clone(),
                vector,
            }));
        }

        Ok(out)
    }

    fn prompt_text<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.prompts.text(key).unwrap_or(fallback)
    }

    fn system_prompt(&self, mode: QueryMode, context: &str) -> String {
        let response_type = self.prompt_text("DEFAULT_RESPONSE_TYPE", DEFAULT_RESPONSE_TYPE);
        match mode {
            QueryMode::Naive => self
                .prompt_text("naive_rag_response", "{content_data}")
                .replace("{response_type}", response_type)
                .replace("{content_data}", context),
            _ => self
                .prompt_text("rag_response", "{context_data}")
                .replace("{response_type}", response_type)
                .replace("{context_data}", context),
        }
    }

    async fn cached_response(&self, key: &str) -> ApiResult<Option<String>> {
        let _guard = self.io_lock.lock().await;
        let cache: IndexMap<String, CachedResponse> = read_json(&self.path(LLM_CACHE_FILE)).await?;
        Ok(cache.get(key).map(|entry| entry.response.clone()))
    }

    async fn store_response(&self, key: String, mode: QueryMode, response: &str) -> ApiResult<()> {
        let _guard = self.io_lock.lock().await;
        let path = self.path(LLM_CACHE_FILE);
        let mut cache: IndexMap<String, CachedResponse> = read_json(&path).await?;
        cache.insert(
            key,
            CachedResponse {
                mode: mode.to_string(),
                response: response.to_string(),
            },
        );
        write_json(&path, &cache).await
    }
}

#[async_trait]
impl RagEngine for LocalRag {
    async fn insert(&self, text: &str) -> ApiResult<()> {
        let content = text.trim();
        if content.is_empty() {
            tracing::warn!("⚠️ Ignoring empty document");
            return Ok(());
        }
        let doc_id = format!("doc-{:x}", md5::compute(content));

        let known_chunks = {
            let _guard = self.io_lock.lock().await;
            let docs: IndexMap<String, FullDoc> = read_json(&self.path(FULL_DOCS_FILE)).await?;
            if docs.contains_key(&doc_id) {
                tracing::info!("Document {} already indexed, skipping", doc_id);
                return Ok(());
            }
            read_json::<IndexMap<String, TextChunk>>(&self.path(TEXT_CHUNKS_FILE)).await?
        };

        let new_chunks: Vec<(String, TextChunk)> = chunk_text(content, CHUNK_TOKEN_SIZE, CHUNK_OVERLAP_TOKENS)
            .into_iter()
            .enumerate()
            .map(|(index, (tokens, chunk))| {
                let id = format!("chunk-{:x}", md5::compute(&chunk));
                (
                    id,
                    TextChunk {
                        tokens,
                        content: chunk,
                        chunk_order_index: index,
                        full_doc_id: doc_id.clone(),
                    },
                )
            })
            .filter(|(id, _)| !known_chunks.contains_key(id))
            .collect();

        // no lock held across embedding calls
        let embedded = self.embed_chunks(&new_chunks).await?;

        let _guard = self.io_lock.lock().await;
        let mut docs: IndexMap<String, FullDoc> = read_json(&self.path(FULL_DOCS_FILE)).await?;
        if docs.contains_key(&doc_id) {
            tracing::info!("Document {} was indexed concurrently, skipping", doc_id);
            return Ok(());
        }
        let mut chunks: IndexMap<String, TextChunk> = read_json(&self.path(TEXT_CHUNKS_FILE)).await?;
        let mut vectors: ChunkVectors = read_json(&self.path(VDB_CHUNKS_FILE)).await?;

        let mut chunk_count = 0;
        for ((id, chunk), record) in new_chunks.into_iter().zip(embedded) {
            if chunks.contains_key(&id) {
                continue;
            }
            chunks.insert(id, chunk);
            vectors.data.push(record);
            chunk_count += 1;
        }
        vectors.embedding_dim = self.embedding.embedding_dim;
        docs.insert(
            doc_id.clone(),
            FullDoc {
                content: content.to_string(),
            },
        );

        write_json(&self.path(FULL_DOCS_FILE), &docs).await?;
        write_json(&self.path(TEXT_CHUNKS_FILE), &chunks).await?;
        write_json(&self.path(VDB_CHUNKS_FILE), &vectors).await?;

        tracing::info!("✅ Indexed document {} as {} new chunks", doc_id, chunk_count);
        Ok(())
    }

    async fn query(&self, query: &str, param: QueryParam) -> ApiResult<String> {
        let store = self.load_store().await?;
        let query_vector = self.query_vector(&store, query).await?;
        self.answer(query, param, &store, query_vector.as_deref()).await
    }

    async fn query_modes(&self, query: &str, params: &[QueryParam]) -> ApiResult<Vec<String>> {
        let store = self.load_store().await?;
        let query_vector = self.query_vector(&store, query).await?;
        try_join_all(
            params
                .iter()
                .map(|param| self.answer(query, *param, &store, query_vector.as_deref())),
        )
        .await
    }
}

impl LocalRag {
    /// Embedding of `query`, or `None` when nothing is indexed yet
    async fn query_vector(&self, store: &Store, query: &str) -> ApiResult<Option<Vec<f32>>> {
        if store.vectors.data.is_empty() {
            return Ok(None);
        }
        let vector = self
            .embedding
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Remote("No embedding returned for query".to_string()))?;
        Ok(Some(vector))
    }

    async fn answer(
        &self,
        query: &str,
        param: QueryParam,
        store: &Store,
        query_vector: Option<&[f32]>,
    ) -> ApiResult<String> {
        let context = query_vector.and_then(|vector| {
            let ranked = rank_chunks(&store.vectors.data, vector);
            build_context(param.mode, store, &ranked)
        });

        let Some(context) = context.filter(|c| !c.trim().is_empty()) else {
            tracing::debug!("No context found for {} query", param.mode);
            return Ok(self.prompt_text("fail_response", DEFAULT_FAIL_RESPONSE).to_string());
        };

        if param.only_need_context {
            return Ok(context);
        }

        let system_prompt = self.system_prompt(param.mode, &context);
        let cache_key = hex::encode(Sha256::digest(
            format!("{}{}{}", param.mode, system_prompt, query).as_bytes(),
        ));

        if let Some(hit) = self.cached_response(&cache_key).await? {
            tracing::debug!("LLM cache hit for {} query", param.mode);
            return Ok(hit);
        }

        let answer = self.llm.complete(query, Some(&system_prompt), &[]).await?;
        self.store_response(cache_key, param.mode, &answer).await?;
        Ok(answer)
    }
}

/// Builds a [`LocalRag`] per working directory
pub struct LocalRagFactory;

#[async_trait]
impl RagEngineFactory for LocalRagFactory {
    async fn build(&self, settings: EngineSettings) -> ApiResult<Arc<dyn RagEngine>> {
        fs::create_dir_all(&settings.working_dir).await?;
        tracing::debug!("Building engine for {}", settings.working_dir.display());
        Ok(Arc::new(LocalRag::new(settings)))
    }
}

/// Split into windows of `size` whitespace tokens overlapping by `overlap`.
/// Returns `(token_count, text)` pairs.
fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<(usize, String)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < tokens.len() {
        let end = (start + size).min(tokens.len());
        chunks.push((end - start, tokens[start..end].join(" ")));
        if end == tokens.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn truncate_tokens(text: &str, max_tokens: usize) -> String {
    text.split_whitespace().take(max_tokens).collect::<Vec<_>>().join(" ")
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot_product / (magnitude_a * magnitude_b)
    }
}

/// All chunks ordered by descending similarity to `query`
fn rank_chunks<'a>(data: &'a [ChunkVector], query: &[f32]) -> Vec<&'a ChunkVector> {
    let mut scored: Vec<(f32, &ChunkVector)> = data
        .iter()
        .map(|record| (cosine_similarity(&record.vector, query), record))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, record)| record).collect()
}

fn build_context(mode: QueryMode, store: &Store, ranked: &[&ChunkVector]) -> Option<String> {
    let context = match mode {
        QueryMode::Naive => naive_context(ranked),
        QueryMode::Local => local_context(store, ranked),
        QueryMode::Global => global_context(store, ranked),
        QueryMode::Hybrid => {
            let parts: Vec<String> = [local_context(store, ranked), global_context(store, ranked)]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect();
            parts.join("\n\n")
        }
    };
    (!context.is_empty()).then_some(context)
}

fn naive_context(ranked: &[&ChunkVector]) -> String {
    ranked
        .iter()
        .take(TOP_K)
        .map(|record| record.content.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Top chunks widened with the chunks right before and after them
fn local_context(store: &Store, ranked: &[&ChunkVector]) -> String {
    let by_position: HashMap<(&str, usize), &TextChunk> = store
        .chunks
        .values()
        .map(|chunk| ((chunk.full_doc_id.as_str(), chunk.chunk_order_index), chunk))
        .collect();

    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for record in ranked.iter().take(TOP_K) {
        let Some(seed) = store.chunks.get(&record.id) else {
            continue;
        };
        let order = seed.chunk_order_index;
        let positions = [order.checked_sub(1), Some(order), order.checked_add(1)];

        for position in positions.into_iter().flatten() {
            let key = (seed.full_doc_id.as_str(), position);
            if let Some(chunk) = by_position.get(&key) {
                if seen.insert(key) {
                    selected.push(chunk.content.as_str());
                }
            }
        }
    }

    if selected.is_empty() {
        return String::new();
    }
    format!("-----Sources-----\n{}", selected.join(CHUNK_SEPARATOR))
}

/// Whole documents ranked by their best chunk
fn global_context(store: &Store, ranked: &[&ChunkVector]) -> String {
    let mut seen = HashSet::new();
    let documents: Vec<&str> = ranked
        .iter()
        .filter(|record| seen.insert(record.full_doc_id.as_str()))
        .filter_map(|record| store.docs.get(&record.full_doc_id))
        .take(TOP_DOCS)
        .map(|doc| doc.content.as_str())
        .collect();

    if documents.is_empty() {
        return String::new();
    }
    format!("-----Documents-----\n{}", documents.join(CHUNK_SEPARATOR))
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> ApiResult<T> {
    if !fs::try_exists(path).await? {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&fs::read(path).await?)?)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> ApiResult<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?).await?;
    Ok(())
}
