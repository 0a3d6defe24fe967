use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use ctxrag_api::services::{
    load_template, ChatMessage, ContextStore, EmbeddingClient, EmbeddingFunc, EngineSettings,
    LlmClient, LocalRagFactory, RagEngine, RagEngineFactory,
};
use ctxrag_api::{configure_routes, ApiError, ApiResult, AppState};
use ctxrag_models::{QueryMode, QueryParam};

/// Deterministic bag-of-words embedding
struct WordHashEmbedding;

#[async_trait]
impl EmbeddingClient for WordHashEmbedding {
    async fn embed(&self, texts: &[String]) -> ApiResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0; 32];
                for word in text.split_whitespace() {
                    v[word.len() % 32] += 1.0;
                }
                v
            })
            .collect())
    }
}

struct EchoLlm;

#[async_trait]
impl LlmClient for EchoLlm {
    async fn complete(&self, prompt: &str, system: Option<&str>, _: &[ChatMessage]) -> ApiResult<String> {
        Ok(format!("{} | {}", prompt, system.map(str::len).unwrap_or(0)))
    }
}

/// Engine whose global-mode retrieval always fails
struct BrokenGlobalEngine;

#[async_trait]
impl RagEngine for BrokenGlobalEngine {
    async fn insert(&self, _: &str) -> ApiResult<()> {
        Ok(())
    }

    async fn query(&self, query: &str, param: QueryParam) -> ApiResult<String> {
        match param.mode {
            QueryMode::Global => Err(ApiError::Remote("graph store unavailable".to_string())),
            mode => Ok(format!("{} answer to {}", mode, query)),
        }
    }
}

struct BrokenGlobalFactory;

#[async_trait]
impl RagEngineFactory for BrokenGlobalFactory {
    async fn build(&self, _: EngineSettings) -> ApiResult<Arc<dyn RagEngine>> {
        Ok(Arc::new(BrokenGlobalEngine))
    }
}

async fn app_state(root: &Path) -> web::Data<AppState> {
    app_state_with(root, Arc::new(LocalRagFactory)).await
}

async fn app_state_with(root: &Path, factory: Arc<dyn RagEngineFactory>) -> web::Data<AppState> {
    let template = load_template(None).await.unwrap();
    let embedding = EmbeddingFunc::probe(Arc::new(WordHashEmbedding), 8192).await.unwrap();
    let state = AppState::new(
        ContextStore::new(root, template),
        factory,
        Arc::new(EchoLlm),
        embedding,
    )
    .await
    .unwrap();
    web::Data::new(state)
}

fn multipart_body(boundary: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n",
        b = boundary,
        f = filename
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[actix_web::test]
async fn test_health() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "healthy"}));
}

#[actix_web::test]
async fn test_create_insert_query_flow() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "dickens", "description": "A Christmas Carol"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "dickens");

    let req = test::TestRequest::get().uri("/contexts").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["contexts"][0]["id"], json!(id));
    assert_eq!(listed["contexts"][0]["description"], "A Christmas Carol");

    let req = test::TestRequest::post()
        .uri(&format!("/insert?context_id={}", id))
        .set_json(json!({"text": "Scrooge was a squeezing, wrenching, grasping old sinner."}))
        .to_request();
    let inserted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(inserted, json!({"status": "success", "message": "Text inserted successfully"}));

    let req = test::TestRequest::post()
        .uri(&format!("/query?context_id={}", id))
        .set_json(json!({"query": "Who is Scrooge?"}))
        .to_request();
    let answered: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(answered["status"], "success");
    for mode in ["naive", "local", "global_", "hybrid"] {
        let answer = answered["data"][mode].as_str().unwrap();
        assert!(answer.starts_with("Who is Scrooge?"), "{}: {}", mode, answer);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/query?context_id={}", id))
        .set_json(json!({"query": "Scrooge", "only_need_context": true}))
        .to_request();
    let contexts: Value = test::call_and_read_body_json(&app, req).await;
    assert!(contexts["data"]["naive"].as_str().unwrap().contains("grasping old sinner"));

    let req = test::TestRequest::get()
        .uri(&format!("/generated_files/{}", id))
        .to_request();
    let files: Value = test::call_and_read_body_json(&app, req).await;
    let files: Vec<&str> = files["files"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert!(files.contains(&"kv_store_full_docs.json"));
    assert!(files.contains(&"vdb_chunks.json"));
    assert!(!files.contains(&"vdb_entities.json"));

    let req = test::TestRequest::get()
        .uri(&format!("/generated_files/{}/kv_store_full_docs.json", id))
        .to_request();
    let file: Value = test::call_and_read_body_json(&app, req).await;
    assert!(file["content"].as_str().unwrap().contains("grasping old sinner"));
}

#[actix_web::test]
async fn test_deleted_context_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "temp"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete().uri(&format!("/contexts/{}", id)).to_request();
    let deleted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(deleted["message"], json!(format!("Context {} deleted successfully", id)));

    let req = test::TestRequest::post()
        .uri(&format!("/insert?context_id={}", id))
        .set_json(json!({"text": "late"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"detail": "Context not found"}));

    let req = test::TestRequest::delete().uri(&format!("/contexts/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_prompt_update_wraps_array_scalar() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "prompts"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/update_prompt?context_id={}", id))
        .set_json(json!({"variable": "DEFAULT_ENTITY_TYPES", "type": "array", "value": "ship"}))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["message"], "Variable DEFAULT_ENTITY_TYPES updated successfully");

    let req = test::TestRequest::get()
        .uri(&format!("/get_prompt_variables?context_id={}", id))
        .to_request();
    let vars: Value = test::call_and_read_body_json(&app, req).await;
    let entity_types = vars["variables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == "DEFAULT_ENTITY_TYPES")
        .unwrap();
    assert_eq!(entity_types["type"], "array");
    assert_eq!(entity_types["currentValue"], json!(["ship"]));
}

#[actix_web::test]
async fn test_insert_file_decodes_gbk_and_rejects_garbage() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "upload"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let boundary = "ctxrag-boundary";
    let req = test::TestRequest::post()
        .uri(&format!("/insert_file?context_id={}", id))
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(multipart_body(boundary, "chinese.txt", &[0xD6, 0xD0, 0xCE, 0xC4]))
        .to_request();
    let inserted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(inserted["message"], "File content from chinese.txt inserted successfully");

    let docs = std::fs::read_to_string(root.path().join(&id).join("kv_store_full_docs.json")).unwrap();
    assert!(docs.contains("中文"));

    let req = test::TestRequest::post()
        .uri(&format!("/insert_file?context_id={}", id))
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(multipart_body(boundary, "binary.bin", &[0xFF, 0xFF]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_missing_context_id_is_validation_error() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/insert")
        .set_json(json!({"text": "orphan"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].is_string());
}

#[actix_web::test]
async fn test_clear_context_keeps_metadata() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "clearable"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/insert?context_id={}", id))
        .set_json(json!({"text": "Bob Cratchit works for Scrooge."}))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/contexts/{}/clear", id))
        .to_request();
    let cleared: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cleared["message"], json!(format!("Context {} data cleared successfully", id)));

    let req = test::TestRequest::get()
        .uri(&format!("/generated_files/{}", id))
        .to_request();
    let files: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(files, json!({"files": []}));

    let req = test::TestRequest::get().uri("/contexts").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["contexts"][0]["name"], "clearable");
}

#[actix_web::test]
async fn test_visualize_renders_graphml() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "graph"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/visualize?context_id={}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    std::fs::write(
        root.path().join(&id).join("graph_chunk_entity_relation.graphml"),
        r#"<graphml><graph><node id="&quot;SCROOGE&quot;"><data key="d0">"PERSON"</data></node></graph></graphml>"#,
    )
    .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/visualize?context_id={}&regenerate=true", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&html).contains("SCROOGE"));
    assert!(root.path().join(&id).join("knowledge_graph.html").exists());
}

#[actix_web::test]
async fn test_clear_root_removes_loose_files_only() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(root.path()).await).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "survivor"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    std::fs::write(root.path().join("kv_store_full_docs.json"), "{}").unwrap();

    let req = test::TestRequest::get().uri("/contexts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed["contexts"].as_array().unwrap().len(), 1);
    assert_eq!(listed["contexts"][0]["name"], "survivor");

    let req = test::TestRequest::post().uri("/clear").to_request();
    let cleared: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cleared["message"], "All data cleared successfully");

    assert!(!root.path().join("kv_store_full_docs.json").exists());
    assert!(root.path().join(created["id"].as_str().unwrap()).is_dir());
}

#[actix_web::test]
async fn test_query_fails_whole_when_one_mode_fails() {
    let root = tempfile::tempdir().unwrap();
    let state = app_state_with(root.path(), Arc::new(BrokenGlobalFactory)).await;
    let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/contexts")
        .set_json(json!({"name": "partial"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/query?context_id={}", id))
        .set_json(json!({"query": "Who is Marley?"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("graph store unavailable"));
    assert!(body.get("data").is_none());
    assert!(body.get("status").is_none());
}
