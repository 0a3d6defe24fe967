use actix_web::{web, HttpResponse};

use ctxrag_models::{ApiResponse, ContextQuery, PromptVariables, UpdatePromptRequest};

use crate::errors::ApiResult;
use crate::state::AppState;

pub async fn get_prompt_variables(
    state: web::Data<AppState>,
    query: web::Query<ContextQuery>,
) -> ApiResult<HttpResponse> {
    let variables = state.prompts.variables(&query.context_id).await?;
    Ok(HttpResponse::Ok().json(PromptVariables { variables }))
}

pub async fn update_prompt(
    state: web::Data<AppState>,
    query: web::Query<ContextQuery>,
    req: web::Json<UpdatePromptRequest>,
) -> ApiResult<HttpResponse> {
    let req = req.into_inner();
    state
        .prompts
        .update(&query.context_id, &req.variable, &req.kind, req.value)
        .await?;
    // prompts are bound when an engine is built
    state.registry.invalidate(&query.context_id).await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(format!(
        "Variable {} updated successfully",
        req.variable
    ))))
}
