use std::sync::Arc;

use crate::config::Config;
use crate::templates::pipeline::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup around the shared provider client.
    pub pipeline: Arc<Pipeline>,
    pub config: Config,
}
