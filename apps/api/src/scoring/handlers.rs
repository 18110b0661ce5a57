//! Axum route handlers for the Scoring API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::paper::Paper;
use crate::pipeline::orchestrator::{classify_and_rank, select_top_n};
use crate::scoring::classifier::RelevanceVerdict;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub papers: Vec<Paper>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    /// Papers that passed the keyword pre-filter, in rank order.
    pub verdicts: Vec<RelevanceVerdict>,
    /// Ids the pipeline would summarize with the configured top-N.
    pub selected: Vec<String>,
}

/// POST /api/v1/classify
///
/// Runs the relevance classifier only. No summaries are produced.
pub async fn handle_classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    if request.papers.is_empty() {
        return Err(AppError::Validation("papers cannot be empty".to_string()));
    }

    let verdicts = classify_and_rank(&request.papers, &state.pipeline, &state.llm).await;
    let selected = select_top_n(&verdicts, state.pipeline.pipeline.top_n)
        .into_iter()
        .map(|i| verdicts[i].paper_id.clone())
        .collect();

    Ok(Json(ClassifyResponse { verdicts, selected }))
}
