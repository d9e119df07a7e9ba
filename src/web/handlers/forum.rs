use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::core::app::AppState;
use crate::core::error::AppResult;
use crate::core::types::{
    CreateForumRequest, CreateThreadRequest, Forum, ForumThreadsQuery, ForumUsersQuery, Thread,
    User,
};
use crate::storage::repositories::Insert;
use crate::web::extract::{Json, Path, Query};

pub async fn create_forum(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateForumRequest>,
) -> AppResult<(StatusCode, Json<Forum>)> {
    Ok(match state.forums.create(request).await? {
        Insert::Created(forum) => (StatusCode::CREATED, Json(forum)),
        Insert::Existing(forum) => (StatusCode::CONFLICT, Json(forum)),
    })
}

pub async fn get_forum(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Json<Forum>> {
    Ok(Json(state.forums.get(&slug).await?))
}

pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(request): Json<CreateThreadRequest>,
) -> AppResult<(StatusCode, Json<Thread>)> {
    Ok(match state.threads.create(&slug, request).await? {
        Insert::Created(thread) => (StatusCode::CREATED, Json(thread)),
        Insert::Existing(thread) => (StatusCode::CONFLICT, Json(thread)),
    })
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<ForumUsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.forums.users(&slug, query).await?))
}

pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<ForumThreadsQuery>,
) -> AppResult<Json<Vec<Thread>>> {
    Ok(Json(state.forums.threads(&slug, query).await?))
}
