//! Subscriber setup for the API server and the graph-loader CLI.

use std::env;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `json` selects JSON lines, anything else human-readable output
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Settings read from `LOG_FORMAT`, `RUST_LOG`, `LOG_SPANS` and `LOG_LOCATION`
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub format: LogFormat,
    /// Fallback directive when `RUST_LOG` is unset or invalid
    pub level: String,
    pub log_spans: bool,
    pub include_location: bool,
}

fn flag(name: &str) -> bool {
    env::var(name).map(|v| v == "true" || v == "1").unwrap_or(false)
}

impl TracingConfig {
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            format: LogFormat::parse(&env::var("LOG_FORMAT").unwrap_or_default()),
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_spans: flag("LOG_SPANS"),
            include_location: flag("LOG_LOCATION"),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    fn span_events(&self) -> FmtSpan {
        if self.log_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Install the global subscriber. A second call leaves the first in place.
pub fn init_tracing(config: TracingConfig) {
    let base = fmt::layer()
        .with_span_events(config.span_events())
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = match config.format {
        LogFormat::Json => registry.with(base.json().with_current_span(true)).try_init(),
        LogFormat::Pretty => registry.with(base).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(
            service = %config.service_name,
            format = config.format.as_str(),
            "📝 Logging ready"
        );
    }
}

pub fn init_tracing_for(service_name: &str) {
    init_tracing(TracingConfig::for_service(service_name));
}
