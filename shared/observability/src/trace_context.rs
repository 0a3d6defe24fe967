//! Per-request trace ids and the RAG context a request targets.

use actix_web::HttpRequest;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const W3C_TRACEPARENT_HEADER: &str = "traceparent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub request_id: String,
    /// Span id of the caller when a `traceparent` header was sent
    pub parent_span_id: Option<String>,
    pub context_id: Option<String>,
}

impl TraceContext {
    /// Build from `traceparent`, else `x-trace-id` / `x-request-id`, else fresh ids
    pub fn from_request(req: &HttpRequest) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        if let Some((trace_id, parent)) = header(W3C_TRACEPARENT_HEADER)
            .as_deref()
            .and_then(parse_traceparent)
        {
            return Self {
                request_id: header(REQUEST_ID_HEADER).unwrap_or_else(|| trace_id.clone()),
                trace_id,
                parent_span_id: Some(parent),
                context_id: None,
            };
        }

        let trace_id = header(TRACE_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            request_id: header(REQUEST_ID_HEADER).unwrap_or_else(|| trace_id.clone()),
            trace_id,
            parent_span_id: None,
            context_id: None,
        }
    }

    pub fn with_context(mut self, context_id: Option<String>) -> Self {
        self.context_id = context_id;
        self
    }

    pub fn response_headers(&self) -> [(&'static str, &str); 2] {
        [
            (TRACE_ID_HEADER, self.trace_id.as_str()),
            (REQUEST_ID_HEADER, self.request_id.as_str()),
        ]
    }
}

/// `00-<trace>-<parent>-<flags>` into `(trace, parent)`
fn parse_traceparent(value: &str) -> Option<(String, String)> {
    let mut parts = value.split('-');
    let _version = parts.next()?;
    let trace = parts.next().filter(|t| !t.is_empty())?;
    let parent = parts.next().filter(|p| !p.is_empty())?;
    Some((trace.to_string(), parent.to_string()))
}

/// RAG context id from `?context_id=`, or from the `/contexts/{id}` and
/// `/generated_files/{id}` path forms
pub fn context_id_of(path: &str, query: &str) -> Option<String> {
    let from_query = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "context_id" && !value.is_empty()).then(|| value.to_string())
    });
    if from_query.is_some() {
        return from_query;
    }

    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("contexts" | "generated_files"), Some(id)) if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_traceparent_wins() {
        let req = TestRequest::default()
            .insert_header((W3C_TRACEPARENT_HEADER, "00-abc123-def456-01"))
            .insert_header((TRACE_ID_HEADER, "ignored"))
            .to_http_request();
        let ctx = TraceContext::from_request(&req);

        assert_eq!(ctx.trace_id, "abc123");
        assert_eq!(ctx.request_id, "abc123");
        assert_eq!(ctx.parent_span_id.as_deref(), Some("def456"));
        assert!(parse_traceparent("garbage").is_none());
    }

    #[test]
    fn test_request_id_header_is_kept() {
        let req = TestRequest::default()
            .insert_header((REQUEST_ID_HEADER, "req-42"))
            .to_http_request();
        let ctx = TraceContext::from_request(&req);

        assert_eq!(ctx.request_id, "req-42");
        assert!(!ctx.trace_id.is_empty());
        assert_ne!(ctx.trace_id, "req-42");
    }

    #[test]
    fn test_context_id_extraction() {
        assert_eq!(context_id_of("/query", "context_id=abc&x=1"), Some("abc".to_string()));
        assert_eq!(context_id_of("/contexts/abc/clear", ""), Some("abc".to_string()));
        assert_eq!(context_id_of("/generated_files/abc/vdb_chunks.json", ""), Some("abc".to_string()));
        assert_eq!(context_id_of("/contexts", ""), None);
        assert_eq!(context_id_of("/health", ""), None);
    }
}
