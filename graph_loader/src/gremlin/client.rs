use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use super::graphson::simplify;
use crate::errors::{LoaderError, LoaderResult};

/// Named parameters bound into a Gremlin script
pub type Bindings = Map<String, Value>;

/// Build bindings from a `json!({...})` object literal. Non-objects bind nothing.
pub fn bindings(value: Value) -> Bindings {
    match value {
        Value::Object(map) => map,
        _ => Bindings::new(),
    }
}

/// Submits Gremlin scripts to a graph database
#[async_trait]
pub trait GremlinClient: Send + Sync {
    /// Run `query` with `bindings` and return the result list
    async fn submit(&self, query: &str, bindings: Bindings) -> LoaderResult<Vec<Value>>;
}

#[derive(Serialize)]
struct ScriptRequest<'a> {
    gremlin: &'a str,
    bindings: &'a Bindings,
}

/// Gremlin client over the HTTPS script endpoint (Neptune, Gremlin Server)
#[derive(Clone)]
pub struct HttpGremlinClient {
    client: Client,
    url: String,
}

impl HttpGremlinClient {
    /// Create a client for a full endpoint URL such as
    /// `https://my-cluster.cluster-xxxx.us-east-1.neptune.amazonaws.com:8182/gremlin`
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        tracing::info!("🔷 Gremlin endpoint: {}", url);
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GremlinClient for HttpGremlinClient {
    async fn submit(&self, query: &str, bindings: Bindings) -> LoaderResult<Vec<Value>> {
        tracing::debug!(query = %query, bindings = bindings.len(), "submitting gremlin script");

        let response = self
            .client
            .post(&self.url)
            .json(&ScriptRequest {
                gremlin: query,
                bindings: &bindings,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LoaderError::Gremlin(format!("{} - {}", status, error_text)));
        }

        let body: Value = response.json().await?;
        Ok(result_list(body))
    }
}

/// Extract `result.data` from a script response as a flat list
fn result_list(body: Value) -> Vec<Value> {
    let data = body
        .get("result")
        .and_then(|r| r.get("data"))
        .cloned()
        .unwrap_or(Value::Null);

    match simplify(data) {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}
