use actix_web::{web, HttpResponse};

use ctxrag_models::{ApiResponse, ContextList, CreateContextRequest};

use crate::errors::ApiResult;
use crate::state::AppState;

pub async fn create_context(
    state: web::Data<AppState>,
    req: web::Json<CreateContextRequest>,
) -> ApiResult<HttpResponse> {
    let req = req.into_inner();
    let meta = state.contexts.create(&req.name, req.description).await?;
    Ok(HttpResponse::Ok().json(meta))
}

pub async fn list_contexts(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let contexts = state.contexts.list().await?;
    Ok(HttpResponse::Ok().json(ContextList { contexts }))
}

pub async fn delete_context(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let context_id = path.into_inner();
    state.contexts.delete(&context_id).await?;
    state.registry.invalidate(&context_id).await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(format!(
        "Context {} deleted successfully",
        context_id
    ))))
}

/// Wipe engine data but keep metadata and prompts, then rebuild the engine
pub async fn clear_context(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let context_id = path.into_inner();
    state.contexts.clear(&context_id).await?;
    state.registry.reinitialize(&context_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(format!(
        "Context {} data cleared successfully",
        context_id
    ))))
}
