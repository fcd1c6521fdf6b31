//! Unified API error type with Axum `IntoResponse` support.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use sd_rag::RagError;
use sd_sheets::StoreError;

/// API error type that converts to proper HTTP responses.
///
/// Messages are short and caller-facing; detail goes to the log at the
/// conversion site.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store call failed");
        match e {
            StoreError::Config(_) => ApiError::Internal("spreadsheet is not configured".into()),
            _ => ApiError::Upstream("spreadsheet unavailable, please retry".into()),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        tracing::error!(error = %e, "answer engine call failed");
        match e {
            RagError::EmptySource(range) => {
                ApiError::Upstream(format!("knowledge range '{range}' has no rows"))
            }
            RagError::Incompatible(_) => {
                ApiError::Unavailable("index is being rebuilt, please retry".into())
            }
            _ => ApiError::Upstream("model provider unavailable, please retry".into()),
        }
    }
}

/// Convenience alias.
pub type ApiResult<T> = Result<T, ApiError>;
