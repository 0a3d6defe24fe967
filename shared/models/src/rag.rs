use serde::{Deserialize, Serialize};
use std::fmt;

/// Retrieval strategy understood by the RAG engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Naive,
    Local,
    Global,
    Hybrid,
}

impl QueryMode {
    pub const ALL: [QueryMode; 4] = [
        QueryMode::Naive,
        QueryMode::Local,
        QueryMode::Global,
        QueryMode::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Naive => "naive",
            QueryMode::Local => "local",
            QueryMode::Global => "global",
            QueryMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub mode: QueryMode,
    #[serde(default)]
    pub only_need_context: bool,
}

impl QueryParam {
    pub fn new(mode: QueryMode) -> Self {
        Self {
            mode,
            only_need_context: false,
        }
    }

    pub fn with_only_context(mut self, only_need_context: bool) -> Self {
        self.only_need_context = only_need_context;
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub only_need_context: bool,
}

/// One answer per retrieval mode. The global answer goes out as `global_`,
/// the key existing clients read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResponse {
    pub naive: String,
    pub local: String,
    #[serde(rename = "global_")]
    pub global: String,
    pub hybrid: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InsertRequest {
    pub text: String,
}

/// Envelope shared by the mutating endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = ()> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success_with(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            data: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        let names: Vec<&str> = QueryMode::ALL.iter().map(QueryMode::as_str).collect();
        assert_eq!(names, vec!["naive", "local", "global", "hybrid"]);
        assert_eq!(serde_json::to_string(&QueryMode::Global).unwrap(), "\"global\"");
    }

    #[test]
    fn test_query_response_keys() {
        let body = serde_json::to_value(QueryResponse {
            naive: "n".into(),
            local: "l".into(),
            global: "g".into(),
            hybrid: "h".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"naive": "n", "local": "l", "global_": "g", "hybrid": "h"})
        );
    }

    #[test]
    fn test_message_envelope_skips_data() {
        let body = serde_json::to_value(ApiResponse::success("done")).unwrap();
        assert_eq!(body, serde_json::json!({"status": "success", "message": "done"}));
    }
}
