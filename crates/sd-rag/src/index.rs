//! Exact inner-product nearest-neighbor index and its on-disk artifact.
//!
//! The artifact is one JSON document (model name, dimensionality, vectors,
//! parallel metadata). It is written to a temporary file in the target
//! directory and renamed over the previous artifact, so readers see either
//! the old index or the new one.

use std::io::{BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use sd_protocol::RetrievedMatch;

use crate::document::IndexedDocument;
use crate::error::{RagError, RagResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    model: String,
    dims: usize,
    vectors: Vec<Vec<f32>>,
    documents: Vec<IndexedDocument>,
}

impl FlatIndex {
    /// Pair vectors with their documents. Every vector must share one dimensionality.
    pub fn new(
        model: impl Into<String>,
        vectors: Vec<Vec<f32>>,
        documents: Vec<IndexedDocument>,
    ) -> RagResult<Self> {
        if vectors.len() != documents.len() {
            return Err(RagError::Incompatible(format!(
                "{} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }
        let dims = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.iter().any(|v| v.len() != dims) {
            return Err(RagError::Incompatible("vectors have mixed dimensionality".into()));
        }
        Ok(Self {
            model: model.into(),
            dims,
            vectors,
            documents,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[IndexedDocument] {
        &self.documents
    }

    /// Whether vectors in this index live in `model`'s embedding space.
    pub fn is_compatible(&self, model: &str) -> bool {
        self.model == model
            && self.vectors.len() == self.documents.len()
            && self.vectors.iter().all(|v| v.len() == self.dims)
    }

    /// Top-`k` documents by inner product, best first. Fewer than `k` when the index is small.
    pub fn search(&self, query: &[f32], k: usize) -> RagResult<Vec<RetrievedMatch>> {
        if !self.is_empty() && query.len() != self.dims {
            return Err(RagError::Incompatible(format!(
                "query has {} dims, index has {}",
                query.len(),
                self.dims
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(v, query)))
            .filter(|(_, score)| score.is_finite())
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievedMatch {
                row: self.documents[i].row,
                text: self.documents[i].text.clone(),
                score,
            })
            .collect())
    }

    /// Atomically replace the artifact at `path`.
    pub fn persist(&self, path: &Path) -> RagResult<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, self)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RagError::Io(e.error))?;

        tracing::info!(path = %path.display(), rows = self.len(), dims = self.dims, "index artifact written");
        Ok(())
    }

    /// Load an artifact. `Ok(None)` when no file exists.
    pub fn load(path: &Path) -> RagResult<Option<Self>> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let index: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(index))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(row: u32, text: &str) -> IndexedDocument {
        IndexedDocument {
            row,
            text: text.into(),
        }
    }

    fn sample() -> FlatIndex {
        FlatIndex::new(
            "mini",
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]],
            vec![doc(2, "a"), doc(3, "b"), doc(4, "c")],
        )
        .unwrap()
    }

    #[test]
    fn search_orders_by_inner_product() {
        let hits = sample().search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].row, 3);
        assert_eq!(hits[1].row, 4);
        assert!((hits[1].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn search_returns_fewer_than_k_on_small_index() {
        assert_eq!(sample().search(&[1.0, 0.0], 6).unwrap().len(), 3);
    }

    #[test]
    fn search_rejects_wrong_dimensionality() {
        assert!(matches!(
            sample().search(&[1.0, 0.0, 0.0], 1),
            Err(RagError::Incompatible(_))
        ));
    }

    #[test]
    fn empty_index_searches_to_nothing() {
        let index = FlatIndex::new("mini", vec![], vec![]).unwrap();
        assert!(index.search(&[1.0], 6).unwrap().is_empty());
    }

    #[test]
    fn new_rejects_mismatched_lengths() {
        assert!(FlatIndex::new("mini", vec![vec![1.0]], vec![]).is_err());
        assert!(FlatIndex::new("mini", vec![vec![1.0], vec![1.0, 0.0]], vec![doc(2, "a"), doc(3, "b")]).is_err());
    }

    #[test]
    fn persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");
        let index = sample();
        index.persist(&path).unwrap();

        let loaded = FlatIndex::load(&path).unwrap().unwrap();
        assert_eq!(loaded, index);
        assert!(loaded.is_compatible("mini"));
        assert!(!loaded.is_compatible("other-model"));
    }

    #[test]
    fn persist_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        sample().persist(&path).unwrap();

        let smaller = FlatIndex::new("mini", vec![vec![1.0, 0.0]], vec![doc(2, "only")]).unwrap();
        smaller.persist(&path).unwrap();

        assert_eq!(FlatIndex::load(&path).unwrap().unwrap().len(), 1);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary files must not be left behind");
    }

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FlatIndex::load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn load_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FlatIndex::load(&path).is_err());
    }
}
