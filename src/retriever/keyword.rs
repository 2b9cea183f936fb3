//! Exact keyword retrieval.

use crate::error::{FinnError, Result};
use crate::search::{ResultRecord, Retriever};
use crate::store::{MatchExpr, VideoStore};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Full-text retriever: the base stage of every search and the target of
/// every widened query.
pub struct KeywordRetriever {
    store: Arc<dyn VideoStore>,
}

impl KeywordRetriever {
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    #[instrument(skip(self, channels), fields(retriever = "keyword"))]
    async fn search(
        &self,
        query: &str,
        channels: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<ResultRecord>> {
        let expr = MatchExpr::parse(query);
        if expr.is_empty() {
            debug!("Nothing searchable in query");
            return Ok(Vec::new());
        }

        self.store
            .keyword_search(&expr, channels, limit)
            .await
            .map_err(|e| FinnError::retrieval(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryVideoStore, SqliteVideoStore, Video};

    fn videos() -> Vec<Video> {
        vec![
            Video::new(
                "vid00000001",
                "VERL: Volcano Engine Reinforcement Learning",
                "UCrl",
                "2024-06-01",
                "An open source RLHF library.",
            ),
            Video::new(
                "vid00000002",
                "Reinforcement learning basics",
                "UCrl",
                "2024-03-15",
                "Rewards, states and actions.",
            ),
        ]
    }

    #[tokio::test]
    async fn test_same_answers_from_both_stores() {
        let sqlite = Arc::new(SqliteVideoStore::in_memory().unwrap());
        let memory = Arc::new(MemoryVideoStore::new());
        sqlite.upsert_batch(&videos()).await.unwrap();
        memory.upsert_batch(&videos()).await.unwrap();

        for store in [sqlite as Arc<dyn VideoStore>, memory as Arc<dyn VideoStore>] {
            let retriever = KeywordRetriever::new(store);

            let rows = retriever
                .search("reinforcement learning", &BTreeSet::new(), 10)
                .await
                .unwrap();
            assert_eq!(rows.len(), 2);

            let rows = retriever
                .search("volcano engine", &BTreeSet::new(), 10)
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, "vid00000001");
        }
    }

    #[tokio::test]
    async fn test_punctuation_only_query_returns_nothing() {
        let store = Arc::new(MemoryVideoStore::new());
        store.upsert_batch(&videos()).await.unwrap();
        let retriever = KeywordRetriever::new(store);

        let rows = retriever.search("?? !!", &BTreeSet::new(), 10).await.unwrap();
        assert!(rows.is_empty());
    }
}
