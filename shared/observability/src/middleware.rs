//! Request logging middleware.
//!
//! Each request runs inside an `http_request` span tagged with its trace id
//! and RAG context id, gets `x-trace-id` / `x-request-id` echoed on the
//! response, and ends with one log line whose level follows [`Outcome`].

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::Instrument;

use crate::trace_context::{context_id_of, TraceContext};

/// Paths only logged at debug level
const QUIET_PATHS: [&str; 2] = ["/health", "/favicon.ico"];

/// A query fans out into four LLM calls, so only long stalls count as slow
pub const DEFAULT_SLOW_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    ServerError,
    ClientError,
    Slow,
    Quiet,
    Ok,
}

impl Outcome {
    pub fn classify(status: u16, path: &str, elapsed_ms: u64, slow_ms: u64) -> Self {
        if status >= 500 {
            Outcome::ServerError
        } else if status >= 400 {
            Outcome::ClientError
        } else if elapsed_ms > slow_ms {
            Outcome::Slow
        } else if QUIET_PATHS.iter().any(|p| path.starts_with(p)) {
            Outcome::Quiet
        } else {
            Outcome::Ok
        }
    }
}

#[derive(Clone)]
pub struct ObservabilityMiddleware {
    service_name: Rc<str>,
    slow_ms: u64,
}

impl ObservabilityMiddleware {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: Rc::from(service_name),
            slow_ms: DEFAULT_SLOW_MS,
        }
    }

    pub fn with_slow_threshold(mut self, ms: u64) -> Self {
        self.slow_ms = ms;
        self
    }
}

pub fn observability(service_name: &str) -> ObservabilityMiddleware {
    ObservabilityMiddleware::new(service_name)
}

impl<S, B> Transform<S, ServiceRequest> for ObservabilityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ObservabilityService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ObservabilityService {
            service: Rc::new(service),
            settings: self.clone(),
        }))
    }
}

pub struct ObservabilityService<S> {
    service: Rc<S>,
    settings: ObservabilityMiddleware,
}

impl<S, B> Service<ServiceRequest> for ObservabilityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let settings = self.settings.clone();

        Box::pin(async move {
            let method = req.method().to_string();
            let path = req.path().to_string();
            let trace = TraceContext::from_request(req.request())
                .with_context(context_id_of(&path, req.query_string()));
            req.extensions_mut().insert(trace.clone());

            let span = tracing::info_span!(
                "http_request",
                service = &*settings.service_name,
                trace_id = %trace.trace_id,
                context_id = trace.context_id.as_deref().unwrap_or("-"),
                method = %method,
                path = %path,
            );

            let start = Instant::now();
            let result = service.call(req).instrument(span).await;
            let ms = start.elapsed().as_millis() as u64;

            let mut res = match result {
                Ok(res) => res,
                Err(e) => {
                    tracing::error!(trace_id = %trace.trace_id, "❌ {} {} failed after {}ms: {}", method, path, ms, e);
                    return Err(e);
                }
            };

            for (name, value) in trace.response_headers() {
                if let Ok(value) = HeaderValue::from_str(value) {
                    res.headers_mut().insert(HeaderName::from_static(name), value);
                }
            }

            let status = res.status().as_u16();
            match Outcome::classify(status, &path, ms, settings.slow_ms) {
                Outcome::ServerError => {
                    tracing::error!(trace_id = %trace.trace_id, status, "← {} {} {} {}ms", method, path, status, ms)
                }
                Outcome::ClientError => {
                    tracing::warn!(trace_id = %trace.trace_id, status, "← {} {} {} {}ms", method, path, status, ms)
                }
                Outcome::Slow => {
                    tracing::warn!(trace_id = %trace.trace_id, status, "🐢 {} {} {} took {}ms", method, path, status, ms)
                }
                Outcome::Quiet => tracing::debug!(status, "← {} {} {}", method, path, status),
                Outcome::Ok => {
                    tracing::info!(trace_id = %trace.trace_id, status, "← {} {} {} {}ms", method, path, status, ms)
                }
            }
            Ok(res)
        })
    }
}
