//! Embedding-backed (hybrid) retrieval.

use crate::embedding::Embedder;
use crate::error::{FinnError, Result};
use crate::search::{ResultRecord, Retriever};
use crate::store::VideoStore;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ranks stored video embeddings by cosine similarity to the embedded query.
pub struct SemanticRetriever {
    store: Arc<dyn VideoStore>,
    embedder: Arc<dyn Embedder>,
    min_similarity: f32,
}

impl SemanticRetriever {
    pub fn new(store: Arc<dyn VideoStore>, embedder: Arc<dyn Embedder>, min_similarity: f32) -> Self {
        Self {
            store,
            embedder,
            min_similarity,
        }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    fn name(&self) -> &str {
        "semantic"
    }

    #[instrument(skip(self, channels), fields(retriever = "semantic"))]
    async fn search(
        &self,
        query: &str,
        channels: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<ResultRecord>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| FinnError::retrieval(self.name(), e.to_string()))?;

        let rows = self
            .store
            .similarity_search(&embedding, channels, limit, self.min_similarity)
            .await
            .map_err(|e| FinnError::retrieval(self.name(), e.to_string()))?;

        debug!("{} rows above similarity {}", rows.len(), self.min_similarity);
        Ok(rows)
    }
}
