mod config;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod scoring;
mod state;
mod summarization;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, PipelineConfig};
use crate::llm_client::{LlmClient, OpenAiCompatProvider};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dailypapers v{}", env!("CARGO_PKG_VERSION"));

    // Pipeline config problems are fatal: nothing runs on a bad config
    let pipeline = PipelineConfig::load(&config.pipeline_config_path).with_context(|| {
        format!(
            "loading pipeline config from {}",
            config.pipeline_config_path.display()
        )
    })?;
    info!(
        "Pipeline config loaded: {} keywords, top_n {}, concurrency {}",
        pipeline.classifier.keyword_weights.len(),
        pipeline.pipeline.top_n,
        pipeline.pipeline.concurrency
    );

    let api_key = pipeline.llm.api_key()?;
    let provider = Arc::new(OpenAiCompatProvider::new(&pipeline.llm.base_url, api_key)?);
    let llm = LlmClient::new(provider, pipeline.llm.clone());
    info!(
        "LLM client initialized (scoring: {}, map: {}, reduce: {})",
        pipeline.classifier.scoring.model,
        pipeline.summarizer.map.model,
        pipeline.summarizer.reduce.model
    );

    let state = AppState {
        llm,
        pipeline: Arc::new(pipeline),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
