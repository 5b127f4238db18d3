//! Event handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use goalhub_core::{Event, EventId, EventUpdate, NewEvent};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// List events.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.store.list_events().await?))
}

/// Get one event.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Event>, ApiError> {
    state
        .store
        .get_event(&event_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))
}

/// Create an event (admin or manager).
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    auth.require_staff()?;

    let event = request.into_event()?;
    state.store.insert_event(&event).await?;

    tracing::info!(event_id = %event.id, title = %event.title, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Partially update an event (admin or manager).
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(event_id): Path<EventId>,
    Json(update): Json<EventUpdate>,
) -> Result<Json<Event>, ApiError> {
    auth.require_staff()?;

    let mut event = state
        .store
        .get_event(&event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    event.apply(update)?;
    state.store.update_event(&event).await?;

    Ok(Json(event))
}

/// Delete an event (admin or manager).
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(event_id): Path<EventId>,
) -> Result<StatusCode, ApiError> {
    auth.require_staff()?;

    state.store.delete_event(&event_id).await?;

    tracing::info!(event_id = %event_id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}
