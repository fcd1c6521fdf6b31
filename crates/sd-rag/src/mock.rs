//! Deterministic in-process model providers for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::embeddings::{EmbeddingProvider, normalize};
use crate::error::{RagError, RagResult};
use crate::llm::ChatModel;

const HASH_DIMS: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bag-of-words embedder: each lowercase alphanumeric token is hashed
/// (FNV-1a) into one of 256 buckets, then the vector is normalized.
///
/// Texts sharing words score higher, which is enough to exercise retrieval.
/// Batch calls can be held open with `hold`/`release` to observe builds in flight.
pub struct HashEmbedder {
    model: String,
    batch_calls: AtomicUsize,
    failing: AtomicBool,
    gate: watch::Sender<bool>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_model("hash-embedder")
    }

    pub fn with_model(model: impl Into<String>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            model: model.into(),
            batch_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            gate,
        }
    }

    /// Number of `embed_batch` calls, queries included.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Block every subsequent call until `release`.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; HASH_DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[bucket(&token.to_lowercase())] += 1.0;
        }
        normalize(&mut v);
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket(token: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % HASH_DIMS as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(RagError::Embedding("mock embedder failure".into()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Chat model returning queued replies, then a fixed default. Records every call.
pub struct ScriptedChat {
    default_reply: String,
    queued: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(String, String, f32)>>,
    failing: AtomicBool,
}

impl ScriptedChat {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            queued: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Reply to the next call with `reply` (FIFO).
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.queued).push_back(reply.into());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// `(system, user, temperature)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String, f32)> {
        lock(&self.calls).clone()
    }

    pub fn last_call(&self) -> Option<(String, String, f32)> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> RagResult<String> {
        lock(&self.calls).push((system.to_string(), user.to_string(), temperature));
        if self.failing.load(Ordering::SeqCst) {
            return Err(RagError::Chat("mock chat failure".into()));
        }
        Ok(lock(&self.queued)
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_vectors_are_normalized_and_deterministic() {
        let a = HashEmbedder::vector("Closed on Sunday");
        let b = HashEmbedder::vector("closed ON sunday");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn embedder_counts_and_fails_on_demand() {
        let embedder = HashEmbedder::new();
        embedder.embed("hello").await.unwrap();
        embedder.set_failing(true);
        assert!(embedder.embed("hello").await.is_err());
        assert_eq!(embedder.batch_calls(), 2);
    }

    #[tokio::test]
    async fn held_embedder_waits_for_release() {
        let embedder = std::sync::Arc::new(HashEmbedder::new());
        embedder.hold();
        let task = {
            let embedder = embedder.clone();
            tokio::spawn(async move { embedder.embed("x").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        embedder.release();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn chat_replays_queue_then_default() {
        let chat = ScriptedChat::new("default");
        chat.push_reply("first");
        assert_eq!(chat.complete("s", "u", 0.0).await.unwrap(), "first");
        assert_eq!(chat.complete("s", "u", 0.0).await.unwrap(), "default");
        assert_eq!(chat.call_count(), 2);
    }
}
