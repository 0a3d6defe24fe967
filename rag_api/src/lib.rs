//! Multi-context RAG HTTP service.
//!
//! Each context is an isolated directory with its own prompts and engine
//! state; a registry memoizes one engine per context.

pub mod errors;
pub mod handlers;
pub mod services;
pub mod state;

use actix_web::{error, web, HttpRequest};

pub use errors::{ApiError, ApiResult};
pub use state::AppState;

/// Register every route
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/contexts", web::post().to(handlers::create_context))
        .route("/contexts", web::get().to(handlers::list_contexts))
        .route("/contexts/{context_id}", web::delete().to(handlers::delete_context))
        .route("/contexts/{context_id}/clear", web::delete().to(handlers::clear_context))
        .route("/query", web::post().to(handlers::query))
        .route("/insert", web::post().to(handlers::insert))
        .route("/insert_file", web::post().to(handlers::insert_file))
        .route("/clear", web::post().to(handlers::clear_all))
        .route("/visualize", web::get().to(handlers::visualize))
        .route("/get_prompt_variables", web::get().to(handlers::get_prompt_variables))
        .route("/update_prompt", web::post().to(handlers::update_prompt))
        .route("/generated_files/{context_id}", web::get().to(handlers::list_generated_files))
        .route(
            "/generated_files/{context_id}/{filename}",
            web::get().to(handlers::get_generated_file),
        )
        .route("/health", web::get().to(handlers::health_check));
}

/// Malformed JSON bodies become 422 with a `detail` message
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024 * 1024)
        .error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
            ApiError::Validation(err.to_string()).into()
        })
}

/// Missing or malformed query parameters become 422 with a `detail` message
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, _req: &HttpRequest| {
        ApiError::Validation(err.to_string()).into()
    })
}
