//! Administrative index resync.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use sd_rag::RebuildStart;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    /// Hold the response until the rebuild finishes.
    #[serde(default)]
    pub wait: bool,
}

/// POST /api/sync: rebuild the knowledge index from the sheet.
///
/// The build always runs on a background task. By default the handler
/// answers 202 immediately; `?wait=true` reports the row count or failure.
pub async fn sync(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    match state.engine.start_rebuild() {
        RebuildStart::AlreadyRunning => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "already_building" })),
        )),
        RebuildStart::Started(done) if params.wait => match done.await {
            Ok(Ok(rows)) => Ok((StatusCode::OK, Json(json!({ "synced_rows": rows })))),
            Ok(Err(detail)) => Err(ApiError::Upstream(format!("sync failed: {detail}"))),
            Err(_) => Err(ApiError::Internal("sync ended without a result".into())),
        },
        RebuildStart::Started(_) => {
            tracing::info!("resync accepted");
            Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
        }
    }
}
