//! Tabular store error types.

use thiserror::Error;

/// Errors that can occur while talking to the tabular store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store configuration error: {0}")]
    Config(String),

    #[error("store request failed: {0}")]
    Request(String),

    #[error("store returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid range '{0}'")]
    InvalidRange(String),

    #[error("store unreachable")]
    Unreachable,
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Request(e.to_string())
    }
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;
