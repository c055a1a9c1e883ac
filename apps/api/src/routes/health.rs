use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and configured models.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "logtemplar-api",
        "completion_model": state.config.completion_model,
        "embedding_model": state.config.embedding_model,
        "pipeline_concurrency": state.pipeline.concurrency(),
    }))
}
