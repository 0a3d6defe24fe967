use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;

use ctxrag_api::{configure_routes, AppState};
use ctxrag_config::{load_dotenv, AppConfig};
use ctxrag_observability::{init_tracing, observability, TracingConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing(TracingConfig::for_service("ctxrag-api"));

    tracing::info!("🚀 Starting ctxrag API...");

    let config = AppConfig::from_env()?;
    tracing::info!("WORKING_DIR: {}", config.rag_dir.display());
    tracing::info!("LLM_MODEL: {}", config.llm.model);
    tracing::info!("EMBEDDING_MAX_TOKEN_SIZE: {}", config.embedding.max_token_size);

    let state = AppState::from_config(&config)
        .await
        .context("failed to initialize application state")?;
    let state = web::Data::new(state);
    tracing::info!("✅ Application state initialized");

    let bind = (config.host.clone(), config.port);
    tracing::info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .expose_any_header()
                    .max_age(3600),
            )
            .wrap(observability("ctxrag-api"))
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
