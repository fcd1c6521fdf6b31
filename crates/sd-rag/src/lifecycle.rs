//! Non-blocking answer engine lifecycle.
//!
//! State is derived from two fields: the `building` flag (single in-flight
//! build guard) and the published engine pointer.
//!
//! | building | engine | state    |
//! |----------|--------|----------|
//! | true     | any    | Building |
//! | false    | Some   | Ready    |
//! | false    | None   | Unbuilt  |
//!
//! Builds run on a spawned task. A supervisor task awaits it, publishes the
//! new engine with one atomic pointer swap, and only then clears the flag.
//! Readers holding the previous engine keep using it until they drop it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::builder::IndexBuilder;
use crate::engine::AnswerEngine;
use crate::error::RagResult;
use crate::llm::ChatModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Unbuilt,
    Building,
    Ready,
}

/// Where a build gets its index from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Reuse a compatible persisted artifact, else sync from the store.
    LoadOrSync,
    /// Always sync from the store.
    Rebuild,
}

/// Outcome of asking for an explicit rebuild.
pub enum RebuildStart {
    /// Build spawned; resolves with the indexed row count or a failure message.
    Started(oneshot::Receiver<Result<usize, String>>),
    /// Another build holds the guard.
    AlreadyRunning,
}

pub struct EngineLifecycle {
    builder: IndexBuilder,
    chat: Arc<dyn ChatModel>,
    top_k: usize,
    temperature: f32,
    engine: ArcSwapOption<AnswerEngine>,
    building: AtomicBool,
    builds_started: AtomicUsize,
}

impl EngineLifecycle {
    pub fn new(
        builder: IndexBuilder,
        chat: Arc<dyn ChatModel>,
        top_k: usize,
        temperature: f32,
    ) -> Arc<Self> {
        Arc::new(Self {
            builder,
            chat,
            top_k,
            temperature,
            engine: ArcSwapOption::empty(),
            building: AtomicBool::new(false),
            builds_started: AtomicUsize::new(0),
        })
    }

    /// The current engine, if one has ever been built.
    pub fn get_if_ready(&self) -> Option<Arc<AnswerEngine>> {
        self.engine.load_full()
    }

    pub fn state(&self) -> EngineState {
        if self.building.load(Ordering::Acquire) {
            EngineState::Building
        } else if self.engine.load().is_some() {
            EngineState::Ready
        } else {
            EngineState::Unbuilt
        }
    }

    pub fn indexed_rows(&self) -> Option<usize> {
        self.engine.load().as_ref().map(|e| e.indexed_rows())
    }

    /// Total builds spawned over the lifetime of this object.
    pub fn builds_started(&self) -> usize {
        self.builds_started.load(Ordering::SeqCst)
    }

    /// Start a first build if the engine is unbuilt and nothing is in flight.
    ///
    /// Never waits. Returns `true` only for the caller that spawned the build.
    pub fn ensure_build_started(self: &Arc<Self>) -> bool {
        if self.engine.load().is_some() || !self.try_claim() {
            return false;
        }
        // A build may have finished between the readiness check and the claim.
        if self.engine.load().is_some() {
            self.building.store(false, Ordering::Release);
            return false;
        }
        self.spawn_build(BuildMode::LoadOrSync, None);
        true
    }

    /// Start a full rebuild. The current engine stays published until the new one is ready.
    pub fn start_rebuild(self: &Arc<Self>) -> RebuildStart {
        if !self.try_claim() {
            return RebuildStart::AlreadyRunning;
        }
        let (tx, rx) = oneshot::channel();
        self.spawn_build(BuildMode::Rebuild, Some(tx));
        RebuildStart::Started(rx)
    }

    fn try_claim(&self) -> bool {
        self.building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Caller must hold the `building` guard; the supervisor releases it.
    fn spawn_build(self: &Arc<Self>, mode: BuildMode, done: Option<oneshot::Sender<Result<usize, String>>>) {
        self.builds_started.fetch_add(1, Ordering::SeqCst);
        tracing::info!(?mode, "engine build started");

        let worker = {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.construct(mode).await })
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = match worker.await {
                Ok(Ok(engine)) => {
                    let rows = engine.indexed_rows();
                    this.engine.store(Some(Arc::new(engine)));
                    tracing::info!(?mode, rows, "engine ready");
                    Ok(rows)
                }
                Ok(Err(e)) => {
                    tracing::error!(?mode, error = %e, "engine build failed");
                    Err(e.to_string())
                }
                Err(e) => {
                    tracing::error!(?mode, error = %e, "engine build task aborted");
                    Err("engine build task aborted".to_string())
                }
            };
            this.building.store(false, Ordering::Release);
            if let Some(done) = done {
                let _ = done.send(outcome);
            }
        });
    }

    async fn construct(&self, mode: BuildMode) -> RagResult<AnswerEngine> {
        let index = match mode {
            BuildMode::LoadOrSync => self.builder.load_or_sync().await?,
            BuildMode::Rebuild => self.builder.sync().await?,
        };
        AnswerEngine::new(
            index,
            self.builder.embedder(),
            Arc::clone(&self.chat),
            self.top_k,
            self.temperature,
        )
    }
}
