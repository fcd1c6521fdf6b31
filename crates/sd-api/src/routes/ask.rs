//! Conversational entry point.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use crate::dispatch::{Reply, dispatch};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for a free-text utterance.
#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default, alias = "message", alias = "text")]
    pub question: Option<String>,
}

/// POST /api/ask: classify the utterance and run the matching action.
///
/// A body that is not JSON counts as a missing question.
pub async fn ask(State(state): State<AppState>, body: Bytes) -> ApiResult<(StatusCode, Json<Reply>)> {
    let req: AskRequest = serde_json::from_slice(&body).unwrap_or_default();
    let question = req.question.as_deref().map(str::trim).unwrap_or_default();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Missing 'question'.".into()));
    }

    let reply = dispatch(&state, question).await?;
    Ok((reply.status(), Json(reply)))
}
