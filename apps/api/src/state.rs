use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    /// Loaded and validated once at startup; read-only afterwards.
    pub pipeline: Arc<PipelineConfig>,
}
