//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum
//! server. Routes are nested under `/api/`.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/health", get(endpoints::health::check))
        .route("/api/questions", post(endpoints::questions::submit))
        .route("/api/tasks/:id", get(endpoints::questions::status))
        .route("/api/documents", post(endpoints::documents::upload))
        .route("/api/documents", get(endpoints::documents::list))
        .route("/api/documents/:id", delete(endpoints::documents::remove))
        .with_state(ctx)
        // The browser frontend is served from another origin.
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use super::*;
    use crate::config::Settings;
    use crate::llm::MockLlmClient;
    use crate::store::files::DocumentStore;
    use crate::store::memory::InMemoryFactStore;

    fn test_ctx() -> (ApiContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(
            Arc::new(InMemoryFactStore::new()),
            Arc::new(DocumentStore::new(dir.path().to_path_buf()).unwrap()),
            Arc::new(MockLlmClient::new("respuesta de prueba")),
            &Settings::default(),
        );
        (ctx, dir)
    }

    #[tokio::test]
    async fn health_reports_store_stats() {
        let (ctx, _dir) = test_ctx();
        let response = api_router(ctx)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"]["documents"], 0);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_synchronously() {
        let (ctx, _dir) = test_ctx();
        let response = api_router(ctx)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/questions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"question":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn question_submission_returns_task_id() {
        let (ctx, _dir) = test_ctx();
        let router = api_router(ctx.clone());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/questions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"question":"casos de diabetes en 2024"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let id: uuid::Uuid = json["task_id"].as_str().unwrap().parse().unwrap();

        // The task is immediately pollable through the orchestrator.
        assert!(ctx.orchestrator.status(id).is_some());
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let (ctx, _dir) = test_ctx();
        let uri = format!("/api/tasks/{}", uuid::Uuid::new_v4());
        let response = api_router(ctx)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_task_id_is_400() {
        let (ctx, _dir) = test_ctx();
        let response = api_router(ctx)
            .oneshot(
                Request::builder()
                    .uri("/api/tasks/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn document_listing_starts_empty() {
        let (ctx, _dir) = test_ctx();
        let response = api_router(ctx)
            .oneshot(
                Request::builder()
                    .uri("/api/documents")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["documents"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn deleting_unknown_document_is_404() {
        let (ctx, _dir) = test_ctx();
        let uri = format!("/api/documents/{}", uuid::Uuid::new_v4());
        let response = api_router(ctx)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
