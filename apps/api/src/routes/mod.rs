pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::templates::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/templates/extract", post(handlers::handle_extract))
        .route(
            "/api/v1/templates/normalize",
            post(handlers::handle_normalize),
        )
        .with_state(state)
}
