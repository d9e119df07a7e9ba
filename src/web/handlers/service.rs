use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::core::app::AppState;
use crate::core::error::AppResult;
use crate::core::types::ServiceStatus;
use crate::web::extract::Json;

pub async fn status(State(state): State<Arc<AppState>>) -> AppResult<Json<ServiceStatus>> {
    Ok(Json(state.service.status().await?))
}

pub async fn clear(State(state): State<Arc<AppState>>) -> AppResult<StatusCode> {
    state.service.clear().await?;
    Ok(StatusCode::OK)
}

/// Liveness check; also verifies that the pool hands out a working connection.
pub async fn health(State(state): State<Arc<AppState>>) -> AppResult<&'static str> {
    sqlx::query("SELECT 1").execute(state.db.pool()).await?;
    Ok("OK")
}
