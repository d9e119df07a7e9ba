use axum::extract::State;
use std::sync::Arc;

use crate::core::app::AppState;
use crate::core::error::AppResult;
use crate::core::types::{Post, PostDetails, PostDetailsQuery, Related, UpdatePostRequest};
use crate::web::extract::{Json, Path, Query};

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<PostDetailsQuery>,
) -> AppResult<Json<PostDetails>> {
    let related = query
        .related
        .as_deref()
        .map(Related::parse_list)
        .unwrap_or_default();
    Ok(Json(state.posts.get(id, &related).await?))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePostRequest>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.update(id, request).await?))
}
