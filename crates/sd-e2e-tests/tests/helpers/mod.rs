//! Shared test harness for E2E integration tests.
//!
//! Wires the real router, dispatcher, booking book and engine lifecycle over
//! an in-memory spreadsheet and deterministic model providers. The mocks are
//! kept as handles so tests can inject failures or hold a build open.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use sd_api::config::AppConfig;
use sd_api::routes::build_router;
use sd_api::state::AppState;
use sd_rag::mock::{HashEmbedder, ScriptedChat};
use sd_sheets::MemoryStore;

pub const CREATE_ALEX: &str =
    "book the 5 Sessions Ceramic Class for Alex Lee, alex@example.com, 12345678";

/// End-to-end harness around one `AppState`.
pub struct TestHarness {
    pub state: AppState,
    pub router: Router,
    /// In-memory spreadsheet with services, appointments and business hours.
    pub store: Arc<MemoryStore>,
    pub embedder: Arc<HashEmbedder>,
    /// Replies `{}` unless a test queues something else.
    pub chat: Arc<ScriptedChat>,
    dir: tempfile::TempDir,
}

impl TestHarness {
    /// Harness over the sample sheet with an empty index directory.
    pub fn with_sample_data() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_sample_data());
        let embedder = Arc::new(HashEmbedder::new());
        let chat = Arc::new(ScriptedChat::new("{}"));

        let mut config = AppConfig::default();
        config.rag.index_path = dir.path().join("sheet_index.json");

        let state = AppState::new(store.clone(), embedder.clone(), chat.clone(), &config);
        let router = build_router(state.clone());

        Self {
            state,
            router,
            store,
            embedder,
            chat,
            dir,
        }
    }

    /// Location of the persisted index artifact.
    pub fn index_path(&self) -> PathBuf {
        self.dir.path().join("sheet_index.json")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    /// POST /api/ask with `{"question": ...}`.
    pub async fn ask(&self, question: &str) -> (StatusCode, serde_json::Value) {
        self.ask_body(serde_json::json!({ "question": question })).await
    }

    /// POST /api/ask with an arbitrary JSON body.
    pub async fn ask_body(&self, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::post("/api/ask")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    /// POST /api/sync, optionally waiting for the rebuild to finish.
    pub async fn sync(&self, wait: bool) -> (StatusCode, serde_json::Value) {
        let uri = if wait { "/api/sync?wait=true" } else { "/api/sync" };
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    /// GET /api/engine.
    pub async fn engine(&self) -> (StatusCode, serde_json::Value) {
        self.send(Request::get("/api/engine").body(Body::empty()).unwrap())
            .await
    }

    /// GET /api/services.
    pub async fn services(&self) -> (StatusCode, serde_json::Value) {
        self.send(Request::get("/api/services").body(Body::empty()).unwrap())
            .await
    }

    /// Poll GET /api/engine until it reports `state`.
    pub async fn wait_for_engine(&self, state: &str) -> serde_json::Value {
        for _ in 0..300 {
            let (_, json) = self.engine().await;
            if json["state"] == state {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("engine never reached '{state}'");
    }

    /// Sync and wait, asserting success.
    pub async fn make_ready(&self) {
        let (status, json) = self.sync(true).await;
        assert_eq!(status, StatusCode::OK, "sync failed: {json}");
    }
}
