//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus pure helpers for similarity computation and BLOB serialization.
//!
//! Concrete backends (the local fastembed model) live in the `docchat`
//! application crate.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Embedding;

/// Maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic for a fixed model: identical input
/// text yields an identical vector. Model loading happens once, when the
/// implementation is constructed, never per call.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identity (e.g. `"all-minilm-l6-v2"`), stored next to each vector.
    fn model_name(&self) -> &str;

    /// Output dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in order.
    ///
    /// Fails with [`Error::EmbeddingUnavailable`] when the model cannot be
    /// invoked.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingUnavailable("empty embedding response".to_string()))
    }
}

/// Cosine similarity between two vectors.
///
/// Returns `None` when the vectors differ in length, are empty, or either
/// has zero norm. Callers exclude such pairs from ranking instead of
/// dividing by zero.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });

    let magnitude = (sq_a * sq_b).sqrt();
    if magnitude < f32::EPSILON {
        return None;
    }
    Some(dot / magnitude).filter(|s| s.is_finite())
}

/// Serialize an embedding for the `embedding` BLOB column, 4 little-endian
/// bytes per component.
///
/// ```rust
/// use docchat_core::embedding::{blob_to_vec, vec_to_blob};
///
/// let embedding = vec![0.5f32, -1.0];
/// assert_eq!(vec_to_blob(&embedding).len(), 8);
/// assert_eq!(blob_to_vec(&vec_to_blob(&embedding)), embedding);
/// ```
pub fn vec_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Inverse of [`vec_to_blob`]. Trailing bytes that do not form a whole
/// component are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .filter_map(|bytes| bytes.try_into().ok().map(f32::from_le_bytes))
        .collect()
}
