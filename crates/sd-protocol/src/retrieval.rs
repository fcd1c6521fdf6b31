use serde::{Deserialize, Serialize};

/// One retrieved knowledge row, returned to callers for citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    /// 1-based sheet row of the source (header is row 1, so data starts at 2).
    pub row: u32,
    /// Flattened `column: value` text of the row.
    pub text: String,
    /// Inner product against the question embedding (cosine, vectors are normalized).
    pub score: f32,
}
