//! Semantic retrieval over filtered candidates.
//!
//! Scores each surviving record against the query by embedding cosine
//! similarity and returns the top-K as a `RetrievedSet`. Ordering is a
//! total order (score, then quality, then recency, then id), so retrieval
//! over an identical snapshot is idempotent.

use crate::embedding::EmbeddingProvider;
use crate::types::{NormalizedRecord, RetrievedCandidate, RetrievedSet};
use concierge_core::AppResult;
use std::sync::Arc;

/// Retriever over an embedding provider.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever returning at most `top_k` candidates.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self { provider, top_k }
    }

    /// Select the top-K most relevant records for the query.
    ///
    /// An empty candidate pool yields an empty set: a valid terminal
    /// state meaning "no matching member data", not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        candidates: Vec<NormalizedRecord>,
    ) -> AppResult<RetrievedSet> {
        if candidates.is_empty() {
            tracing::debug!("Retriever received an empty candidate pool");
            return Ok(RetrievedSet::empty());
        }

        let query_embedding = self.provider.embed(query).await?;

        let texts: Vec<String> = candidates.iter().map(|c| c.clean_text.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;

        let mut scored: Vec<(NormalizedRecord, f32)> = candidates
            .into_iter()
            .zip(embeddings.iter())
            .map(|(record, embedding)| {
                let score = cosine_similarity(&query_embedding, embedding);
                (record, score)
            })
            .collect();

        // Total order: similarity, then quality, then recency, then id.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.0.quality_score
                        .partial_cmp(&a.0.quality_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.0.record.timestamp.cmp(&a.0.record.timestamp))
                .then_with(|| a.0.record.id.cmp(&b.0.record.id))
        });

        scored.truncate(self.top_k);

        let ranked: Vec<RetrievedCandidate> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (record, similarity_score))| RetrievedCandidate {
                record,
                similarity_score,
                rank: i + 1,
            })
            .collect();

        tracing::debug!(
            "Retrieved {} candidates (top score: {:.3})",
            ranked.len(),
            ranked.first().map(|c| c.similarity_score).unwrap_or(0.0)
        );

        Ok(RetrievedSet::new(ranked))
    }
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
