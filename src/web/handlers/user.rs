use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::core::app::AppState;
use crate::core::error::AppResult;
use crate::core::types::{CreateUserRequest, UpdateUserRequest, User};
use crate::storage::repositories::Insert;
use crate::web::extract::{Json, Path};

/// 201 with the new user, or 409 with every user holding the nickname or email.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Path(nickname): Path<String>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<Response> {
    Ok(match state.users.create(&nickname, request).await? {
        Insert::Created(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Insert::Existing(users) => (StatusCode::CONFLICT, Json(users)).into_response(),
    })
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(nickname): Path<String>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.get(&nickname).await?))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(nickname): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.update(&nickname, request).await?))
}
