//! Similarity retrieval over a project's stored chunks.
//!
//! The [`Retriever`] trait isolates ranking from the rest of the pipeline
//! so an indexed (approximate nearest neighbour) backend can replace the
//! bundled [`FullScanRetriever`] without touching chunking, embedding, or
//! storage.
//!
//! # Full-scan algorithm
//!
//! 1. Load every chunk record of the project. No records → empty result,
//!    and the query is never embedded.
//! 2. Embed the query.
//! 3. Score each record by cosine similarity. Records are skipped when the
//!    embedding is missing, has a zero norm, differs in dimension from the
//!    query, or was produced by a different model.
//! 4. Stable sort by score, descending; ties keep storage order.
//! 5. Keep the top `k`.
//!
//! Cost is O(n) similarity computations plus O(n log n) for the sort, where
//! n is the project's chunk count.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{Error, Result};
use crate::models::{SimilarityResult, StoredChunkRecord};
use crate::store::ChunkStore;

/// Number of chunks handed to the generator by default.
pub const DEFAULT_TOP_K: usize = 5;

/// Ranks a project's chunks against a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top `k` chunks of `project` with their scores, most relevant first.
    async fn retrieve_scored(
        &self,
        query: &str,
        project: &str,
        k: usize,
    ) -> Result<Vec<SimilarityResult>>;

    /// Top `k` chunk contents of `project`, most relevant first.
    async fn retrieve(&self, query: &str, project: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query, project, k)
            .await?
            .into_iter()
            .map(|r| r.content)
            .collect())
    }
}

/// Brute-force cosine ranking over [`ChunkStore::list_by_project`].
pub struct FullScanRetriever {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
}

impl FullScanRetriever {
    pub fn new(store: Arc<dyn ChunkStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl Retriever for FullScanRetriever {
    async fn retrieve_scored(
        &self,
        query: &str,
        project: &str,
        k: usize,
    ) -> Result<Vec<SimilarityResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("retrieval k must be >= 1".to_string()));
        }

        let records = self.store.list_by_project(project).await?;
        if records.is_empty() {
            debug!(project, "no stored chunks; skipping query embedding");
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_one(query).await?;
        let results = rank(&query_vec, &records, Some(self.embedder.model_name()), k);
        debug!(
            project,
            candidates = records.len(),
            returned = results.len(),
            "ranked chunks"
        );
        Ok(results)
    }
}

/// Score `records` against `query_vec` and return the best `k`.
///
/// When `model` is given, records embedded by another model are skipped.
/// Untagged records (written before model tracking) are still compared as
/// long as their dimension matches.
pub fn rank(
    query_vec: &[f32],
    records: &[StoredChunkRecord],
    model: Option<&str>,
    k: usize,
) -> Vec<SimilarityResult> {
    let mut skipped = 0usize;

    let mut scored: Vec<SimilarityResult> = records
        .iter()
        .filter_map(|record| {
            let embedding = record.embedding.as_deref()?;
            if let (Some(want), Some(have)) = (model, record.embedding_model.as_deref()) {
                if want != have {
                    skipped += 1;
                    return None;
                }
            }
            match cosine_similarity(query_vec, embedding) {
                Some(score) => Some(SimilarityResult {
                    score,
                    content: record.content.clone(),
                }),
                None => {
                    skipped += 1;
                    None
                }
            }
        })
        .collect();

    if skipped > 0 {
        warn!(
            skipped,
            "excluded chunks with incomparable embeddings (zero norm, dimension or model mismatch)"
        );
    }

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Embedding;
    use crate::store::memory::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(content: &str, embedding: Option<Vec<f32>>) -> StoredChunkRecord {
        StoredChunkRecord {
            project: "p".to_string(),
            ordinal: 0,
            content: content.to_string(),
            embedding,
            embedding_model: Some("fixed".to_string()),
        }
    }

    /// Embeds every text as the same fixed vector and counts calls.
    struct FixedEmbedder {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.vector.len()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    fn fixed(vector: Vec<f32>) -> Arc<FixedEmbedder> {
        Arc::new(FixedEmbedder {
            vector,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_rank_orders_by_score() {
        let records = vec![
            record("far", Some(vec![0.0, 1.0])),
            record("near", Some(vec![1.0, 0.1])),
            record("middle", Some(vec![1.0, 1.0])),
        ];
        let out = rank(&[1.0, 0.0], &records, None, 5);
        let contents: Vec<&str> = out.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["near", "middle", "far"]);
        assert!(out[0].score > out[1].score);
    }

    #[test]
    fn test_rank_ties_keep_storage_order() {
        let records = vec![
            record("first", Some(vec![2.0, 0.0])),
            record("second", Some(vec![1.0, 0.0])),
            record("third", Some(vec![5.0, 0.0])),
        ];
        let out = rank(&[1.0, 0.0], &records, None, 3);
        let contents: Vec<&str> = out.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_truncates_to_k() {
        let records: Vec<_> = (0..10)
            .map(|i| record(&format!("c{}", i), Some(vec![1.0, i as f32])))
            .collect();
        assert_eq!(rank(&[1.0, 0.0], &records, None, 3).len(), 3);
        assert_eq!(rank(&[1.0, 0.0], &records, None, 50).len(), 10);
    }

    #[test]
    fn test_rank_skips_missing_zero_and_mismatched() {
        let mut other_model = record("other model", Some(vec![1.0, 0.0]));
        other_model.embedding_model = Some("legacy".to_string());
        let records = vec![
            record("missing", None),
            record("zero", Some(vec![0.0, 0.0])),
            record("short", Some(vec![1.0])),
            other_model,
            record("ok", Some(vec![1.0, 0.0])),
        ];
        let out = rank(&[1.0, 0.0], &records, Some("fixed"), 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "ok");
    }

    #[test]
    fn test_rank_zero_query_vector_yields_nothing() {
        let records = vec![record("a", Some(vec![1.0, 0.0]))];
        assert!(rank(&[0.0, 0.0], &records, None, 5).is_empty());
    }

    #[tokio::test]
    async fn test_empty_project_returns_empty_without_embedding() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = fixed(vec![1.0, 0.0]);
        let retriever = FullScanRetriever::new(store, embedder.clone());

        let out = retriever.retrieve("anything", "empty", 5).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrieve_is_project_scoped() {
        let store = Arc::new(InMemoryStore::new());
        let mut foreign = record("foreign", Some(vec![1.0, 0.0]));
        foreign.project = "q".to_string();
        store
            .append(&[foreign, record("own", Some(vec![0.5, 0.5]))])
            .await
            .unwrap();

        let retriever = FullScanRetriever::new(store, fixed(vec![1.0, 0.0]));
        let out = retriever.retrieve("query", "p", 5).await.unwrap();
        assert_eq!(out, vec!["own".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_k_is_invalid() {
        let retriever =
            FullScanRetriever::new(Arc::new(InMemoryStore::new()), fixed(vec![1.0]));
        let err = retriever.retrieve("q", "p", 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
