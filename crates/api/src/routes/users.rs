//! User account endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::{NewUser, User, UserUpdate};
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// GET /users — list all users.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

/// POST /users — register a user and create their cart.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name and email must not be empty".to_string(),
        ));
    }

    let user = state.store.insert_user(req).await?;
    state.store.get_or_create_cart(user.id).await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/:id — fetch one user.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user_id = UserId::from_uuid(id);
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;
    Ok(Json(user))
}

/// PUT /users/:id — apply a partial update.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    let user_id = UserId::from_uuid(id);
    let user = state
        .store
        .update_user(user_id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;
    Ok(Json(user))
}

/// DELETE /users/:id — delete a user and, by cascade, their cart.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = UserId::from_uuid(id);
    state
        .store
        .delete_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;
    Ok(StatusCode::NO_CONTENT)
}
