//! Time-bounded wrappers around the store and embedder.
//!
//! Each call runs under `tokio::time::timeout`; an expired call becomes a
//! recoverable [`Error::Timeout`] naming the operation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docchat_core::embedding::Embedder;
use docchat_core::models::{Embedding, HistoryEntry, Role, StoredChunkRecord};
use docchat_core::store::{ChunkStore, HistoryStore};
use docchat_core::{Error, Result};
use tracing::warn;

async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, secs = limit.as_secs(), "external call timed out");
            Err(Error::Timeout {
                operation,
                secs: limit.as_secs(),
            })
        }
    }
}

/// Store wrapper applying one deadline to every call.
pub struct TimedStore<S> {
    inner: Arc<S>,
    limit: Duration,
}

impl<S> TimedStore<S> {
    pub fn new(inner: Arc<S>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<S: ChunkStore + 'static> ChunkStore for TimedStore<S> {
    async fn append(&self, records: &[StoredChunkRecord]) -> Result<()> {
        bounded("store append", self.limit, self.inner.append(records)).await
    }

    async fn list_by_project(&self, project: &str) -> Result<Vec<StoredChunkRecord>> {
        bounded(
            "store list_by_project",
            self.limit,
            self.inner.list_by_project(project),
        )
        .await
    }

    async fn delete_by_project(&self, project: &str) -> Result<()> {
        bounded(
            "store delete_by_project",
            self.limit,
            self.inner.delete_by_project(project),
        )
        .await
    }
}

#[async_trait]
impl<S: HistoryStore + 'static> HistoryStore for TimedStore<S> {
    async fn append_message(&self, project: &str, role: Role, content: &str) -> Result<()> {
        bounded(
            "store append_message",
            self.limit,
            self.inner.append_message(project, role, content),
        )
        .await
    }

    async fn load_history(&self, project: &str) -> Result<Vec<HistoryEntry>> {
        bounded(
            "store load_history",
            self.limit,
            self.inner.load_history(project),
        )
        .await
    }
}

/// Embedder wrapper applying one deadline to every call.
pub struct TimedEmbedder {
    inner: Arc<dyn Embedder>,
    limit: Duration,
}

impl TimedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl Embedder for TimedEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dims(&self) -> usize {
        self.inner.dims()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        bounded("embedding", self.limit, self.inner.embed(texts)).await
    }
}
