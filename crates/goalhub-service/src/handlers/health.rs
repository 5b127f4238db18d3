//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Deployment environment.
    pub environment: String,
    /// Daraja deployment in use.
    pub mpesa_env: String,
    /// Service version.
    pub version: String,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        environment: state.config.environment.to_string(),
        mpesa_env: state.config.mpesa.environment.as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
