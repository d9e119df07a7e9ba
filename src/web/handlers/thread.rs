use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::core::app::AppState;
use crate::core::error::AppResult;
use crate::core::types::{
    CreatePostRequest, Post, Thread, ThreadPostsQuery, ThreadRef, UpdateThreadRequest,
    VoteRequest,
};
use crate::web::extract::{Json, Path, Query};

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<ThreadRef>,
) -> AppResult<Json<Thread>> {
    Ok(Json(state.threads.get(&thread).await?))
}

pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<ThreadRef>,
    Json(request): Json<UpdateThreadRequest>,
) -> AppResult<Json<Thread>> {
    Ok(Json(state.threads.update(&thread, request).await?))
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<ThreadRef>,
    Query(query): Query<ThreadPostsQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.threads.posts(&thread, query).await?))
}

/// Bulk post creation; all posts share one timestamp.
pub async fn create_posts(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<ThreadRef>,
    Json(requests): Json<Vec<CreatePostRequest>>,
) -> AppResult<(StatusCode, Json<Vec<Post>>)> {
    let posts = state.posts.create(&thread, requests).await?;
    Ok((StatusCode::CREATED, Json(posts)))
}

pub async fn vote(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<ThreadRef>,
    Json(request): Json<VoteRequest>,
) -> AppResult<Json<Thread>> {
    Ok(Json(state.votes.vote(&thread, request).await?))
}
