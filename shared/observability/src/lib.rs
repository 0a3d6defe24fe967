//! Logging and request tracing shared by the API server and the graph loader.

pub mod init;
pub mod middleware;
pub mod trace_context;

pub use init::{init_tracing, init_tracing_for, LogFormat, TracingConfig};
pub use middleware::{observability, ObservabilityMiddleware, Outcome};
pub use trace_context::{context_id_of, TraceContext};
