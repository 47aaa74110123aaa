//! Ingest and query orchestration.
//!
//! ```text
//! ingest: bytes ─▶ extract ─▶ chunk ─▶ embed ─▶ ChunkStore::append
//! ask:    question ─▶ Retriever ─▶ AnswerGenerator ─▶ Answer
//! ```
//!
//! Ingest is all-or-nothing per document: extraction, chunking, and
//! embedding all complete before anything is written, and the bundled
//! stores append the batch atomically. Concurrent ingests into one project
//! are serialized; ingests into different projects run in parallel.
//!
//! The query flow never touches ambient state. Callers pass a
//! [`QueryContext`] naming the project and the conversation so far, and
//! decide whether to persist the turn via [`Pipeline::record_turn`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use docchat_core::chunk::make_chunks;
use docchat_core::embedding::Embedder;
use docchat_core::generate::AnswerGenerator;
use docchat_core::models::{ChatMessage, DocumentKind, HistoryEntry, Role, StoredChunkRecord};
use docchat_core::retrieve::{FullScanRetriever, Retriever};
use docchat_core::store::{ChunkStore, HistoryStore};
use docchat_core::{BackendError, Error, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::backend::HttpGenerator;
use crate::config::{Config, OnBackendError};
use crate::embedding::{create_embedder, DisabledEmbedder};
use crate::extract::extract_text_blocking;
use crate::sqlite_store::SqliteStore;
use crate::timeout::{TimedEmbedder, TimedStore};
use crate::{db, migrate};

/// A raw upload handed over by the surrounding application.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Display name, used only in logs and reports.
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Read a file, inferring the kind from its extension unless given.
    pub fn from_path(path: &std::path::Path, kind: Option<DocumentKind>) -> anyhow::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let kind = match kind {
            Some(k) => k,
            None => DocumentKind::from_file_name(&name)?,
        };
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self { name, kind, bytes })
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub project: String,
    pub document: String,
    pub kind: DocumentKind,
    pub chunks: usize,
    pub chars: usize,
    /// SHA-256 of the uploaded bytes, for duplicate detection by the caller.
    pub sha256: String,
}

/// Per-request query state: the target project and the conversation so far.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub project: String,
    pub history: Vec<ChatMessage>,
}

impl QueryContext {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Result of one query turn.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Generated text, or the rendered backend error.
    pub text: String,
    /// Chunks sent as context, most relevant first.
    pub context: Vec<String>,
    /// Set when `text` is a rendered backend failure.
    pub backend_error: Option<BackendError>,
}

impl Answer {
    pub fn is_error(&self) -> bool {
        self.backend_error.is_some()
    }
}

/// Tunables the orchestrator needs from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub max_chars: usize,
    pub top_k: usize,
    pub on_backend_error: OnBackendError,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chars: docchat_core::chunk::DEFAULT_MAX_CHARS,
            top_k: docchat_core::retrieve::DEFAULT_TOP_K,
            on_backend_error: OnBackendError::Render,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_chars: config.chunking.max_chars,
            top_k: config.retrieval.top_k,
            on_backend_error: config.generation.on_error,
        }
    }
}

pub struct Pipeline {
    chunks: Arc<dyn ChunkStore>,
    history: Arc<dyn HistoryStore>,
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn AnswerGenerator>,
    settings: PipelineSettings,
    project_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

fn require_project(project: &str) -> Result<()> {
    if project.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "a project must be selected".to_string(),
        ));
    }
    Ok(())
}

impl Pipeline {
    /// Wire a pipeline over `store`, ranking with [`FullScanRetriever`].
    pub fn new<S>(
        store: Arc<S>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
        settings: PipelineSettings,
    ) -> Self
    where
        S: ChunkStore + HistoryStore + 'static,
    {
        let chunks: Arc<dyn ChunkStore> = store.clone();
        let retriever = Arc::new(FullScanRetriever::new(chunks.clone(), embedder.clone()));
        Self {
            chunks,
            history: store,
            embedder,
            retriever,
            generator,
            settings,
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the ranking strategy.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn project_lock(&self, project: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .project_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(project.to_string()).or_default().clone()
    }

    /// Extract, chunk, embed, and store one document.
    pub async fn ingest(&self, project: &str, doc: UploadedDocument) -> Result<IngestReport> {
        require_project(project)?;

        let sha256 = format!("{:x}", Sha256::digest(&doc.bytes));
        let UploadedDocument { name, kind, bytes } = doc;
        debug!(project, document = %name, %kind, bytes = bytes.len(), "ingesting document");

        let text = extract_text_blocking(bytes, kind).await.inspect_err(|e| {
            warn!(project, document = %name, error = %e, "document extraction failed");
        })?;

        let chunks = make_chunks(project, &text, self.settings.max_chars)?;
        let mut report = IngestReport {
            project: project.to_string(),
            document: name,
            kind,
            chunks: chunks.len(),
            chars: text.chars().count(),
            sha256,
        };

        if chunks.is_empty() {
            info!(project, document = %report.document, "document has no text; nothing stored");
            return Ok(report);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await.inspect_err(|e| {
            warn!(project, document = %report.document, error = %e, "embedding failed");
        })?;
        if vectors.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "model returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        let dims = self.embedder.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(Error::EmbeddingUnavailable(format!(
                "model returned a {}-dimensional vector, expected {}",
                bad.len(),
                dims
            )));
        }

        let model = self.embedder.model_name();
        let records: Vec<StoredChunkRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| StoredChunkRecord::new(chunk, vector, model))
            .collect();

        let lock = self.project_lock(project);
        let _guard = lock.lock().await;
        self.chunks.append(&records).await.inspect_err(|e| {
            warn!(project, document = %report.document, error = %e, "storing chunks failed");
        })?;

        report.chunks = records.len();
        info!(
            project,
            document = %report.document,
            chunks = report.chunks,
            "document ingested"
        );
        Ok(report)
    }

    /// Answer `question` within `ctx.project` using the configured `top_k`.
    pub async fn ask(&self, ctx: &QueryContext, question: &str) -> Result<Answer> {
        self.ask_with_k(ctx, question, self.settings.top_k).await
    }

    /// Answer `question` using the `k` most relevant chunks.
    ///
    /// Backend failures become the answer text under
    /// [`OnBackendError::Render`] and an [`Error::Backend`] under
    /// [`OnBackendError::Fail`].
    pub async fn ask_with_k(&self, ctx: &QueryContext, question: &str, k: usize) -> Result<Answer> {
        require_project(&ctx.project)?;
        if question.trim().is_empty() {
            return Err(Error::InvalidArgument("question is empty".to_string()));
        }

        let context = self.retriever.retrieve(question, &ctx.project, k).await?;
        debug!(project = %ctx.project, k, retrieved = context.len(), "retrieved context");

        match self
            .generator
            .generate_turn(&ctx.history, question, &context)
            .await
        {
            Ok(text) => Ok(Answer {
                text,
                context,
                backend_error: None,
            }),
            Err(err) => match self.settings.on_backend_error {
                OnBackendError::Render => {
                    warn!(project = %ctx.project, error = %err, "rendering backend failure as answer");
                    Ok(Answer {
                        text: err.to_string(),
                        context,
                        backend_error: Some(err),
                    })
                }
                OnBackendError::Fail => Err(Error::Backend(err)),
            },
        }
    }

    /// Load the stored transcript of `project` into a fresh [`QueryContext`].
    pub async fn load_context(&self, project: &str) -> Result<QueryContext> {
        require_project(project)?;
        let history = self.history.load_history(project).await?;
        Ok(QueryContext::new(project).with_history(history.into_iter().map(Into::into).collect()))
    }

    /// Stored user and assistant turns of `project`, oldest first.
    pub async fn history(&self, project: &str) -> Result<Vec<HistoryEntry>> {
        require_project(project)?;
        self.history.load_history(project).await
    }

    /// Persist a completed turn. Rendered backend errors are not persisted.
    ///
    /// Returns whether anything was written.
    pub async fn record_turn(&self, project: &str, question: &str, answer: &Answer) -> Result<bool> {
        require_project(project)?;
        if answer.is_error() {
            debug!(project, "skipping history for failed turn");
            return Ok(false);
        }
        self.history
            .append_message(project, Role::User, question)
            .await?;
        self.history
            .append_message(project, Role::Assistant, &answer.text)
            .await?;
        Ok(true)
    }

    /// Remove every chunk and chat turn of `project`.
    pub async fn delete_project(&self, project: &str) -> Result<()> {
        require_project(project)?;
        let lock = self.project_lock(project);
        let guard = lock.lock().await;
        self.chunks.delete_by_project(project).await?;
        drop(guard);
        self.release_lock(project, &lock);
        info!(project, "project deleted");
        Ok(())
    }

    /// Forget the lock of a deleted project unless another task still holds
    /// or awaits it.
    fn release_lock(&self, project: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .project_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let idle = locks
            .get(project)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(project);
        }
    }
}

/// Open and migrate the configured database behind the store deadline.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<TimedStore<SqliteStore>>> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    Ok(Arc::new(TimedStore::new(
        Arc::new(SqliteStore::new(pool)),
        config.store.timeout(),
    )))
}

/// Open the configured database, load the embedding model, and build a
/// pipeline talking to the HTTP generation backend.
pub async fn build(config: &Config) -> anyhow::Result<Pipeline> {
    let store = open_store(config).await?;

    let embedder = create_embedder(&config.embedding)
        .await
        .context("Failed to initialize embedding model")?;
    let embedder: Arc<dyn Embedder> =
        Arc::new(TimedEmbedder::new(embedder, config.embedding.timeout()));

    let generator = Arc::new(HttpGenerator::from_config(&config.generation)?);

    Ok(Pipeline::new(
        store,
        embedder,
        generator,
        PipelineSettings::from(config),
    ))
}

/// Build a pipeline for history and deletion only.
///
/// No embedding model is loaded and no API key is read, so ingest and
/// queries on the result fail with `EmbeddingUnavailable`.
pub async fn build_store_only(config: &Config) -> anyhow::Result<Pipeline> {
    let store = open_store(config).await?;
    let generator = Arc::new(HttpGenerator::new(&config.generation, None)?);
    Ok(Pipeline::new(
        store,
        Arc::new(DisabledEmbedder),
        generator,
        PipelineSettings::from(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        Config {
            db: DbConfig {
                path: tmp.path().join("docchat.sqlite"),
            },
            ..Config::default()
        }
    }

    fn lock_count(pipeline: &Pipeline) -> usize {
        pipeline.project_locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn store_only_pipeline_deletes_and_forgets_project_lock() {
        let tmp = TempDir::new().unwrap();
        let pipeline = build_store_only(&config_in(&tmp)).await.unwrap();

        pipeline
            .history
            .append_message("P", Role::User, "hello")
            .await
            .unwrap();
        assert_eq!(pipeline.history("P").await.unwrap().len(), 1);

        pipeline.delete_project("P").await.unwrap();
        assert!(pipeline.history("P").await.unwrap().is_empty());
        assert_eq!(lock_count(&pipeline), 0);
    }

    #[tokio::test]
    async fn held_lock_survives_delete() {
        let tmp = TempDir::new().unwrap();
        let pipeline = build_store_only(&config_in(&tmp)).await.unwrap();

        let other = pipeline.project_lock("P");
        pipeline.delete_project("P").await.unwrap();
        assert_eq!(lock_count(&pipeline), 1);

        drop(other);
        pipeline.delete_project("P").await.unwrap();
        assert_eq!(lock_count(&pipeline), 0);
    }

    #[tokio::test]
    async fn store_only_pipeline_cannot_ingest() {
        let tmp = TempDir::new().unwrap();
        let pipeline = build_store_only(&config_in(&tmp)).await.unwrap();
        let doc = UploadedDocument {
            name: "a.txt".to_string(),
            kind: DocumentKind::Txt,
            bytes: b"hello".to_vec(),
        };
        let err = pipeline.ingest("P", doc).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    }
}
