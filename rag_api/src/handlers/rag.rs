use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;

use ctxrag_models::{
    ApiResponse, ContextQuery, InsertRequest, QueryMode, QueryParam, QueryRequest, QueryResponse,
};

use crate::errors::{ApiError, ApiResult};
use crate::services::text_decode::decode_upload;
use crate::state::AppState;

/// Run the query in every mode concurrently; one failure fails the request
pub async fn query(
    state: web::Data<AppState>,
    ctx: web::Query<ContextQuery>,
    req: web::Json<QueryRequest>,
) -> ApiResult<HttpResponse> {
    let engine = state.registry.get_instance(&ctx.context_id).await?;
    let params: Vec<QueryParam> = QueryMode::ALL
        .iter()
        .map(|mode| QueryParam::new(*mode).with_only_context(req.only_need_context))
        .collect();

    let answers: [String; 4] = engine
        .query_modes(&req.query, &params)
        .await?
        .try_into()
        .map_err(|answers: Vec<String>| {
            ApiError::Internal(format!("Expected 4 answers, got {}", answers.len()))
        })?;
    let [naive, local, global, hybrid] = answers;

    tracing::info!("🔍 Answered query in context {}", ctx.context_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success_with(QueryResponse {
        naive,
        local,
        global,
        hybrid,
    })))
}

pub async fn insert(
    state: web::Data<AppState>,
    ctx: web::Query<ContextQuery>,
    req: web::Json<InsertRequest>,
) -> ApiResult<HttpResponse> {
    let engine = state.registry.get_instance(&ctx.context_id).await?;
    engine.insert(&req.text).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Text inserted successfully")))
}

/// Insert the multipart field `file`, decoded as UTF-8 or GBK
pub async fn insert_file(
    state: web::Data<AppState>,
    ctx: web::Query<ContextQuery>,
    mut payload: Multipart,
) -> ApiResult<HttpResponse> {
    let engine = state.registry.get_instance(&ctx.context_id).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::Validation(format!("Multipart error: {}", e)))?;

        let disposition = field.content_disposition().cloned();
        let is_file = disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .map(|name| name == "file")
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let filename = disposition
            .as_ref()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("upload")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::Validation(format!("Chunk error: {}", e)))?;
            bytes.extend_from_slice(&data);
        }
        upload = Some((filename, bytes));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::Validation("Missing multipart field 'file'".to_string()))?;
    let content = decode_upload(&bytes)?;
    engine.insert(&content).await?;

    tracing::info!("📄 Inserted {} ({} bytes) into context {}", filename, bytes.len(), ctx.context_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(format!(
        "File content from {} inserted successfully",
        filename
    ))))
}

/// Remove the loose files in the storage root and rebuild the default engine
pub async fn clear_all(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    state.contexts.clear_root().await?;
    state.registry.replace_default().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("All data cleared successfully")))
}
