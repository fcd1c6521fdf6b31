//! API route definitions and router builder.

pub mod ask;
pub mod engine;
pub mod health;
pub mod services;
pub mod sync;

use axum::Router;
use axum::http::Uri;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Conversation
        .route("/ask", post(ask::ask))
        // Catalog
        .route("/services", get(services::list_services))
        // Knowledge index administration
        .route("/sync", post(sync::sync))
        .route("/engine", get(engine::engine_status));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(dir: &tempfile::TempDir) -> Router {
        build_router(AppState::with_sample_data(dir.path().join("index.json")))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            Request::get("/api/bookings").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "no route for /api/bookings");
    }

    #[tokio::test]
    async fn list_services() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            Request::get("/api/services").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let services = json.as_array().unwrap();
        assert_eq!(services.len(), 3);
        assert_eq!(services[1]["Name"], "Wheel Throwing Intro");
        assert_eq!(services[2]["Location"], "", "short cells keep their header key");
    }

    #[tokio::test]
    async fn ask_without_question_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(app(&dir), post_json("/api/ask", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing 'question'.");

        let (status, _) = send(
            app(&dir),
            post_json("/api/ask", serde_json::json!({"question": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ask_with_invalid_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::post("/api/ask")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let (status, _) = send(app(&dir), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ask_accepts_message_alias() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            post_json("/api/ask", serde_json::json!({"message": "what services do you offer"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "services.list");
        assert!(json["answer"].as_str().unwrap().starts_with("Available services:"));
        assert_eq!(json["services"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn ask_qa_while_unbuilt_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            post_json("/api/ask", serde_json::json!({"question": "are you open on Sunday?"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["intent"], "qa_initializing");
    }

    #[tokio::test]
    async fn engine_starts_unbuilt() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            Request::get("/api/engine").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "unbuilt");
        assert!(json.get("indexed_rows").is_none());
    }

    #[tokio::test]
    async fn sync_wait_reports_rows_then_engine_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (status, json) = send(
            app.clone(),
            Request::post("/api/sync?wait=true").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["synced_rows"], 3);

        let (_, json) = send(
            app,
            Request::get("/api/engine").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(json["state"], "ready");
        assert_eq!(json["indexed_rows"], 3);
    }

    #[tokio::test]
    async fn sync_default_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(&dir),
            Request::post("/api/sync").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["status"], "accepted");
    }
}
