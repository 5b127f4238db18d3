//! Notification handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use goalhub_core::{NewNotification, Notification, NotificationId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// List notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.store.list_notifications().await?))
}

/// Create a notification.
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Json(request): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let notification = request.into_notification()?;
    state.store.insert_notification(&notification).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Mark a notification as read.
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(
        state.store.mark_notification_read(&notification_id).await?,
    ))
}
