//! Sheetdesk API server.
//!
//! Answers questions about a business from its spreadsheet and books or
//! updates appointments in the same sheet.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sd_api::config::AppConfig;
use sd_api::routes;
use sd_api::state::AppState;
use sd_rag::{HttpEmbedder, OpenAiChat};
use sd_sheets::{MemoryStore, SheetsClient, TabularStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sd-api starting");

    let config = AppConfig::load()?;

    // Talk to Google Sheets if a spreadsheet is configured, otherwise use in-memory sample data.
    let store: Arc<dyn TabularStore> = if config.sheets.is_remote() {
        tracing::info!(range = %config.sheets.knowledge_range, "using Google Sheets store");
        Arc::new(SheetsClient::new(&config.sheets)?)
    } else {
        tracing::warn!("SPREADSHEET_ID not set, using in-memory store with sample data");
        Arc::new(MemoryStore::with_sample_data())
    };

    if config.chat.api_key.is_none() {
        tracing::warn!(base_url = %config.chat.base_url, "no chat API key configured");
    }
    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let chat = Arc::new(OpenAiChat::new(&config.chat)?);

    let state = AppState::new(store, embedder, chat, &config);
    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
