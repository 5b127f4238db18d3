//! Turf handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use goalhub_core::{NewTurf, Turf};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// List turfs by name.
pub async fn list_turfs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Turf>>, ApiError> {
    Ok(Json(state.store.list_turfs().await?))
}

/// Create a turf (admin or manager).
pub async fn create_turf(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<NewTurf>,
) -> Result<Json<Turf>, ApiError> {
    auth.require_staff()?;

    let turf = request.into_turf()?;
    state.store.insert_turf(&turf).await?;

    tracing::info!(turf_id = %turf.id, name = %turf.name, "Turf created");
    Ok(Json(turf))
}
