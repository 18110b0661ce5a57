//! Axum route handlers for the Runs API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::paper::Paper;
use crate::pipeline::orchestrator::{run, RunOutput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub papers: Vec<Paper>,
}

/// POST /api/v1/runs
///
/// Classifies, ranks and summarizes one batch of papers synchronously.
/// Model failures degrade individual verdicts or summaries; the response
/// is a 200 as long as the batch itself was valid.
pub async fn handle_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunOutput>, AppError> {
    if request.papers.is_empty() {
        return Err(AppError::Validation("papers cannot be empty".to_string()));
    }
    if let Some(paper) = request.papers.iter().find(|p| p.id.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "paper \"{}\" has an empty id",
            paper.short_title(50)
        )));
    }

    let output = run(&request.papers, &state.pipeline, &state.llm).await;
    Ok(Json(output))
}
