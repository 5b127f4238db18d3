//! User handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use goalhub_core::{NewUser, User, UserId, UserUpdate};
use goalhub_store::StoreError;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

const DUPLICATE_EMAIL: &str = "User with this email already exists";

/// List users (admin).
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<User>>, ApiError> {
    auth.require_admin()?;
    Ok(Json(state.store.list_users().await?))
}

/// The caller's own user row.
pub async fn get_me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

/// Get one user. Admins may read anyone; others only themselves.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    if auth.user.id != user_id {
        auth.require_admin()?;
    }

    state
        .store
        .get_user(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

/// Create a user (admin).
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    auth.require_admin()?;

    let user = request.into_user()?;
    if state.store.get_user_by_email(&user.email).await?.is_some() {
        return Err(ApiError::BadRequest(DUPLICATE_EMAIL.into()));
    }

    match state.store.insert_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::BadRequest(DUPLICATE_EMAIL.into()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %auth.user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Partially update a user (admin).
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    auth.require_admin()?;

    let mut user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    user.apply(update);
    state.store.update_user(&user).await?;

    Ok(Json(user))
}

/// Delete a user (admin).
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;

    match state.store.delete_user(&user_id).await {
        Ok(()) => {}
        Err(StoreError::NotFound { .. }) => {
            return Err(ApiError::NotFound("User not found".into()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user_id, deleted_by = %auth.user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
