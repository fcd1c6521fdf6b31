use std::path::PathBuf;
use std::sync::Arc;

use sd_sheets::{Table, TabularStore};

use crate::document::IndexedDocument;
use crate::embeddings::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::index::FlatIndex;

/// Turns the knowledge range into a persisted `FlatIndex`.
#[derive(Clone)]
pub struct IndexBuilder {
    store: Arc<dyn TabularStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    range: String,
    index_path: PathBuf,
}

impl IndexBuilder {
    pub fn new(
        store: Arc<dyn TabularStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        range: impl Into<String>,
        index_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            embedder,
            range: range.into(),
            index_path: index_path.into(),
        }
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.embedder)
    }

    /// Embed every data row of `table` in one batch. Touches no durable state.
    pub async fn build(&self, table: &Table) -> RagResult<FlatIndex> {
        let documents = IndexedDocument::from_table(table);
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                vectors.len()
            )));
        }
        FlatIndex::new(self.embedder.model_name(), vectors, documents)
    }

    /// Full rebuild from the store. The previous artifact is replaced only after
    /// the new index is complete.
    pub async fn sync(&self) -> RagResult<FlatIndex> {
        let values = self.store.read(&self.range).await?;
        let table = Table::from_values(values)
            .filter(|t| !t.rows.is_empty())
            .ok_or_else(|| RagError::EmptySource(self.range.clone()))?;

        let index = self.build(&table).await?;
        index.persist(&self.index_path)?;
        tracing::info!(range = %self.range, rows = index.len(), "knowledge index synced");
        Ok(index)
    }

    /// Reuse a persisted artifact built with the current embedding model, else `sync`.
    pub async fn load_or_sync(&self) -> RagResult<FlatIndex> {
        match FlatIndex::load(&self.index_path) {
            Ok(Some(index)) if index.is_compatible(self.embedder.model_name()) && !index.is_empty() => {
                tracing::info!(path = %self.index_path.display(), rows = index.len(), "loaded persisted index");
                return Ok(index);
            }
            Ok(Some(index)) => {
                tracing::warn!(
                    stored_model = %index.model(),
                    current_model = %self.embedder.model_name(),
                    "persisted index incompatible, rebuilding"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, path = %self.index_path.display(), "persisted index unreadable, rebuilding");
            }
        }
        self.sync().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::HashEmbedder;
    use sd_sheets::MemoryStore;

    const RANGE: &str = "Business Hours!A1:Z";

    fn builder(store: Arc<MemoryStore>, embedder: Arc<HashEmbedder>, path: PathBuf) -> IndexBuilder {
        IndexBuilder::new(store, embedder, RANGE, path)
    }

    #[tokio::test]
    async fn sync_indexes_every_data_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_sample_data());
        let embedder = Arc::new(HashEmbedder::new());
        let index = builder(store, embedder.clone(), dir.path().join("index.json"))
            .sync()
            .await
            .unwrap();

        assert_eq!(index.len(), 3);
        let mut rows: Vec<u32> = index.documents().iter().map(|d| d.row).collect();
        rows.dedup();
        assert_eq!(rows, vec![2, 3, 4]);
        assert!(rows.iter().all(|r| *r >= 2));
        assert_eq!(embedder.batch_calls(), 1);
        assert!(dir.path().join("index.json").exists());
    }

    #[tokio::test]
    async fn sync_fails_on_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.set_tab("Business Hours", &[&["Day", "Open"]]);
        let err = builder(store, Arc::new(HashEmbedder::new()), dir.path().join("index.json"))
            .sync()
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptySource(_)));
    }

    #[tokio::test]
    async fn sync_fails_when_store_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_sample_data());
        store.set_unreachable(true);
        let err = builder(store, Arc::new(HashEmbedder::new()), dir.path().join("index.json"))
            .sync()
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Store(_)));
    }

    #[tokio::test]
    async fn failed_embedding_leaves_previous_artifact_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let store = Arc::new(MemoryStore::with_sample_data());
        let embedder = Arc::new(HashEmbedder::new());
        let b = builder(store.clone(), embedder.clone(), path.clone());

        b.sync().await.unwrap();
        let before = std::fs::read(&path).unwrap();

        store.set_tab(
            "Business Hours",
            &[&["Day", "Open"], &["Tuesday", "11:00"]],
        );
        embedder.set_failing(true);
        assert!(b.sync().await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn load_or_sync_reuses_compatible_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let store = Arc::new(MemoryStore::with_sample_data());
        let embedder = Arc::new(HashEmbedder::new());
        builder(store.clone(), embedder.clone(), path.clone())
            .sync()
            .await
            .unwrap();
        let reads = store.reads();

        let index = builder(store.clone(), embedder.clone(), path)
            .load_or_sync()
            .await
            .unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(store.reads(), reads, "no store read when the artifact is reused");
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[tokio::test]
    async fn load_or_sync_rebuilds_for_other_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let store = Arc::new(MemoryStore::with_sample_data());
        builder(store.clone(), Arc::new(HashEmbedder::with_model("old-model")), path.clone())
            .sync()
            .await
            .unwrap();

        let current = Arc::new(HashEmbedder::new());
        let index = builder(store, current.clone(), path.clone())
            .load_or_sync()
            .await
            .unwrap();
        assert_eq!(index.model(), current.model_name());
        assert_eq!(current.batch_calls(), 1);
        assert!(FlatIndex::load(&path).unwrap().unwrap().is_compatible(current.model_name()));
    }
}
