//! Embedding generation for hybrid (semantic) retrieval.

mod ollama;
mod openai;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder selected in the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::from_settings(settings)?),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::from_settings(settings)?),
    };
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_embedder_for_each_provider() {
        let mut settings = EmbeddingSettings::default();
        let openai = create_embedder(&settings).unwrap();
        assert_eq!(openai.dimensions(), 1536);

        settings.provider = EmbeddingProvider::Ollama;
        settings.dimensions = 768;
        let ollama = create_embedder(&settings).unwrap();
        assert_eq!(ollama.dimensions(), 768);
    }
}
