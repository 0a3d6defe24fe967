use actix_files::NamedFile;
use actix_web::{web, HttpResponse};
use tokio::fs;

use ctxrag_models::{is_plain_component, FileContent, GeneratedFiles, VisualizeQuery, GENERATED_FILES};

use crate::errors::{ApiError, ApiResult};
use crate::services::visualize::visualization_path;
use crate::state::AppState;

pub async fn list_generated_files(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let dir = state.contexts.dir(&path).await?;

    let mut files = Vec::new();
    for name in GENERATED_FILES {
        if fs::try_exists(dir.join(name)).await? {
            files.push(name.to_string());
        }
    }
    Ok(HttpResponse::Ok().json(GeneratedFiles { files }))
}

pub async fn get_generated_file(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (context_id, filename) = path.into_inner();
    let dir = state.contexts.dir(&context_id).await?;

    let not_found = || ApiError::NotFound(format!("File {} not found", filename));
    if !is_plain_component(&filename) {
        return Err(not_found());
    }
    let file_path = dir.join(&filename);
    if !fs::metadata(&file_path).await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(not_found());
    }

    let content = fs::read_to_string(&file_path).await?;
    Ok(HttpResponse::Ok().json(FileContent { content }))
}

/// Serve the context's knowledge-graph page
pub async fn visualize(
    state: web::Data<AppState>,
    query: web::Query<VisualizeQuery>,
) -> ApiResult<NamedFile> {
    let dir = state.contexts.dir(&query.context_id).await?;
    let page = visualization_path(&dir, query.regenerate).await?;
    Ok(NamedFile::open_async(page).await?)
}
