use sd_sheets::StoreError;
use thiserror::Error;

/// Errors raised while building or querying the answer engine.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("chat model error: {0}")]
    Chat(String),

    #[error("knowledge source '{0}' has no data rows")]
    EmptySource(String),

    #[error("index incompatible: {0}")]
    Incompatible(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RagResult<T> = Result<T, RagError>;
