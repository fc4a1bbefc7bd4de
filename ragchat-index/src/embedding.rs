//! Embedding function trait for turning chunk text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A model that maps text to fixed-size vector embeddings.
///
/// Vector databases call [`embed_batch`](EmbeddingFunction::embed_batch) once
/// per store call with every chunk's content, and
/// [`embed`](EmbeddingFunction::embed) once per similarity query. The default
/// `embed_batch` calls `embed` sequentially; backends that support native
/// batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::EmbeddingFunction;
///
/// let embeddings = function.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert_eq!(embeddings[0].len(), function.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this function.
    fn dimensions(&self) -> usize;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance, `1 - cosine_similarity`.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
