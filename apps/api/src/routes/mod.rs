pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers::handle_run;
use crate::scoring::handlers::handle_classify;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/classify", post(handle_classify))
        .route("/api/v1/runs", post(handle_run))
        .with_state(state)
}
