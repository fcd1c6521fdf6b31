//! Answer engine readiness.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use sd_rag::EngineState;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_rows: Option<usize>,
}

/// GET /api/engine: lifecycle state and the size of the published index.
pub async fn engine_status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(EngineStatus {
        state: state.engine.state(),
        indexed_rows: state.engine.indexed_rows(),
    })
}
