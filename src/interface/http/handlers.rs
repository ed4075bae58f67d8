use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::adapters::store::{RenderError, CONTENT_TYPE};
use crate::adapters::MemoryRegistry;

/// Custom error type that implements IntoResponse
#[derive(Debug)]
pub struct AppError(String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0).into_response()
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        error!("Failed to render metrics: {}", err);
        AppError(err.to_string())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MemoryRegistry>,
}

/// Handler for GET /metrics
///
/// Serves whatever the registry currently holds; never calls the runtime.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.registry.render()?;
    debug!(bytes = body.len(), "Serving metrics");

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
}
