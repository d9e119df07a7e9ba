use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::app::AppState;
use crate::web::handlers::{forum, post as posts, service, thread, user};

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Forums
        .route("/forum/create", post(forum::create_forum))
        .route("/forum/:slug/details", get(forum::get_forum))
        .route("/forum/:slug/create", post(forum::create_thread))
        .route("/forum/:slug/users", get(forum::list_users))
        .route("/forum/:slug/threads", get(forum::list_threads))
        // Posts
        .route(
            "/post/:id/details",
            get(posts::get_post).post(posts::update_post),
        )
        // Service
        .route("/service/clear", post(service::clear))
        .route("/service/status", get(service::status))
        // Threads
        .route("/thread/:slug_or_id/create", post(thread::create_posts))
        .route(
            "/thread/:slug_or_id/details",
            get(thread::get_thread).post(thread::update_thread),
        )
        .route("/thread/:slug_or_id/posts", get(thread::list_posts))
        .route("/thread/:slug_or_id/vote", post(thread::vote))
        // Users
        .route("/user/:nickname/create", post(user::create_user))
        .route(
            "/user/:nickname/profile",
            get(user::get_user).post(user::update_user),
        );

    Router::new()
        .nest("/api", api)
        .route("/health", get(service::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::storage::database::Database;

    /// Router over a pool that never connects: only requests rejected
    /// before any query can be exercised.
    fn offline_router() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@localhost:1/none")
            .unwrap();
        let db = Arc::new(Database::from_pool(pool));
        create_router(Arc::new(AppState::new(db)))
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = offline_router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    /// Asserts a 400 whose body is the usual `{"message"}` JSON.
    async fn assert_json_400(request: Request<Body>) -> String {
        let response = offline_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"), "{}", content_type);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _) = send(
            Request::get("/api/board/list")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_user_body_is_rejected() {
        let message = assert_json_400(
            Request::post("/api/user/alice/create")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn unknown_sort_mode_is_rejected() {
        let message = assert_json_400(
            Request::get("/api/thread/1/posts?sort=random")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn non_numeric_post_id_is_rejected() {
        let message = assert_json_400(
            Request::get("/api/post/abc/details")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn invalid_voice_is_400_with_message() {
        let (status, body) = send(
            Request::post("/api/thread/some-slug/vote")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"nickname":"alice","voice":5}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("voice"));
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let (status, _) = send(
            Request::delete("/api/service/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn missing_body_fields_are_json_errors() {
        let message = assert_json_400(
            Request::post("/api/forum/create")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"no slug"}"#))
                .unwrap(),
        )
        .await;
        assert!(message.contains("slug") || message.contains("user"), "{}", message);
    }

    #[tokio::test]
    async fn bad_since_is_a_json_error() {
        assert_json_400(
            Request::get("/api/forum/pirates/threads?since=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    }
}
