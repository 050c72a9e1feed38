//! Embedding providers for the retriever.
//!
//! The similarity metric and embedding model are deliberately pluggable:
//! the retriever depends only on this trait. The trigram provider gives
//! deterministic, offline vectors; the Ollama provider gives neural
//! semantic embeddings when a local runtime is available.

pub mod ollama;
pub mod trigram;

pub use ollama::OllamaEmbedding;
pub use trigram::TrigramEmbedding;

use concierge_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Other("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from settings.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramEmbedding::new(settings.dimensions))),

        "ollama" => Ok(Arc::new(OllamaEmbedding::new(
            settings.model.clone(),
            settings.dimensions,
            settings.endpoint.as_deref(),
        ))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            settings.provider
        ))),
    }
}
