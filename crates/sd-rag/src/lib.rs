//! Retrieval-augmented answering over a spreadsheet knowledge table.
//!
//! - `EmbeddingProvider` / `ChatModel`: fallible remote model boundaries
//! - `IndexBuilder`: rows → normalized embeddings → persisted `FlatIndex`
//! - `AnswerEngine`: top-k retrieval plus a context-restricted chat call
//! - `EngineLifecycle`: single in-flight background build, atomic engine swap

pub mod builder;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod llm;
pub mod mock;

pub use builder::IndexBuilder;
pub use config::{ChatConfig, EmbeddingConfig, RagConfig};
pub use document::IndexedDocument;
pub use embeddings::{EmbeddingProvider, HttpEmbedder, normalize};
pub use engine::{Answer, AnswerEngine};
pub use error::{RagError, RagResult};
pub use index::FlatIndex;
pub use lifecycle::{BuildMode, EngineLifecycle, EngineState, RebuildStart};
pub use llm::{ChatModel, OpenAiChat, extract_json};
