use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use ctxrag_graph_loader::LoaderError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn context_not_found() -> Self {
        ApiError::NotFound("Context not found".to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Remote(e.to_string())
    }
}

impl From<LoaderError> for ApiError {
    fn from(e: LoaderError) -> Self {
        match e {
            LoaderError::NotFound(path) => ApiError::NotFound(format!("File {} not found", path)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!("❌ {}", self);
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "detail": self.to_string()
        }))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
