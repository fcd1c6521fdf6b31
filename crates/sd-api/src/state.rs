//! Shared application state for the Axum server.
//!
//! The spreadsheet store and the two model providers are injected, so the
//! same wiring serves production (Sheets + HTTP models) and tests
//! (`MemoryStore` + deterministic mocks).

use std::sync::Arc;

use sd_rag::{ChatModel, EmbeddingProvider, EngineLifecycle, IndexBuilder};
use sd_sheets::{BookingBook, TabularStore};

use crate::config::AppConfig;
use crate::inference::FieldExtractor;

/// Shared application state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Services catalog and appointment rows.
    pub bookings: BookingBook,
    /// Q&A engine lifecycle (lazy first build, background rebuilds).
    pub engine: Arc<EngineLifecycle>,
    /// Booking field extraction (rules plus model gap-fill).
    pub extractor: FieldExtractor,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TabularStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        config: &AppConfig,
    ) -> Self {
        let builder = IndexBuilder::new(
            Arc::clone(&store),
            embedder,
            config.sheets.knowledge_range.clone(),
            config.rag.index_path.clone(),
        );
        let engine = EngineLifecycle::new(
            builder,
            Arc::clone(&chat),
            config.rag.top_k,
            config.chat.temperature,
        );
        Self {
            bookings: BookingBook::new(store, &config.sheets),
            engine,
            extractor: FieldExtractor::new(chat),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Sample spreadsheet with deterministic models.
    ///
    /// The chat mock answers every call with `{}`, so Q&A replies are that
    /// literal and extraction relies on the rule stages alone.
    pub fn with_sample_data(index_path: impl Into<std::path::PathBuf>) -> Self {
        use sd_rag::mock::{HashEmbedder, ScriptedChat};
        use sd_sheets::MemoryStore;

        let mut config = AppConfig::default();
        config.rag.index_path = index_path.into();
        Self::new(
            Arc::new(MemoryStore::with_sample_data()),
            Arc::new(HashEmbedder::new()),
            Arc::new(ScriptedChat::new("{}")),
            &config,
        )
    }
}
