use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::adapters::MemoryRegistry;

use super::handlers::{metrics_handler, AppState};

pub const METRICS_PATH: &str = "/metrics";

pub fn create_router(registry: Arc<MemoryRegistry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
