//! Search context used to re-rank results toward what a user has been
//! looking at.

use crate::error::{FinnError, Result};
use crate::store::VideoStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Words too common to identify a topic.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "what", "how", "why", "who", "are",
    "was", "were", "can", "does", "about", "into", "your", "you", "its", "not", "but", "all",
    "any", "have", "has", "had", "use", "using", "when", "where", "which", "than", "then",
    "them", "they", "our", "out", "get",
];

/// Shortest token considered an entity.
const MIN_ENTITY_CHARS: usize = 3;

/// Context of a single search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchContext {
    /// The user's previous queries, newest first.
    #[serde(default)]
    pub previous_queries: Vec<String>,
    /// Free-form knowledge-graph context. An `entities` array of strings is used.
    #[serde(default)]
    pub graph_context: serde_json::Value,
}

impl SearchContext {
    pub fn new(previous_queries: Vec<String>) -> Self {
        Self {
            previous_queries,
            graph_context: serde_json::Value::Null,
        }
    }

    pub fn with_graph_context(mut self, graph_context: serde_json::Value) -> Self {
        self.graph_context = graph_context;
        self
    }

    /// Lowercased entities to boost: significant words of previous queries
    /// plus the strings listed in `graph_context.entities`.
    pub fn entities(&self) -> HashSet<String> {
        let mut entities: HashSet<String> = self
            .previous_queries
            .iter()
            .flat_map(|q| q.split_whitespace())
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.chars().count() >= MIN_ENTITY_CHARS && !STOP_WORDS.contains(&w.as_str()))
            .collect();

        if let Some(graph) = self.graph_context.get("entities").and_then(|e| e.as_array()) {
            entities.extend(
                graph
                    .iter()
                    .filter_map(|e| e.as_str())
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty()),
            );
        }

        entities
    }

    pub fn is_empty(&self) -> bool {
        self.entities().is_empty()
    }
}

/// Source of per-user search context.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn get_context(&self, user_id: &str) -> Result<SearchContext>;
}

/// Context built from the search history kept in a video store.
pub struct HistoryContextProvider {
    store: Arc<dyn VideoStore>,
    depth: usize,
}

impl HistoryContextProvider {
    pub fn new(store: Arc<dyn VideoStore>, depth: usize) -> Self {
        Self { store, depth }
    }
}

#[async_trait]
impl ContextProvider for HistoryContextProvider {
    #[instrument(skip(self))]
    async fn get_context(&self, user_id: &str) -> Result<SearchContext> {
        let queries = self
            .store
            .recent_queries(user_id, self.depth)
            .await
            .map_err(|e| FinnError::Context(e.to_string()))?;

        debug!("Loaded {} previous queries", queries.len());
        Ok(SearchContext::new(queries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVideoStore;
    use serde_json::json;

    #[test]
    fn test_entities_from_queries_and_graph() {
        let context = SearchContext::new(vec![
            "How does GRPO work?".to_string(),
            "ai agents".to_string(),
        ])
        .with_graph_context(json!({"entities": ["DeepMind", 42, "  "]}));

        let entities = context.entities();
        assert!(entities.contains("grpo"));
        assert!(entities.contains("work"));
        assert!(entities.contains("agents"));
        assert!(entities.contains("deepmind"));
        assert!(!entities.contains("how"));
        assert!(!entities.contains("does"));
        assert!(!entities.contains("ai"));
        assert_eq!(entities.len(), 4);
    }

    #[test]
    fn test_missing_graph_context_is_ignored() {
        let context: SearchContext = serde_json::from_value(json!({
            "previous_queries": ["reinforcement"]
        }))
        .unwrap();
        assert_eq!(context.entities().len(), 1);
        assert!(SearchContext::default().is_empty());
    }

    #[tokio::test]
    async fn test_history_provider() {
        let store = Arc::new(MemoryVideoStore::new());
        store.record_query("alice", "transformers").await.unwrap();
        store.record_query("alice", "attention heads").await.unwrap();
        store.record_query("alice", "rope scaling").await.unwrap();

        let provider = HistoryContextProvider::new(store, 2);
        let context = provider.get_context("alice").await.unwrap();

        assert_eq!(
            context.previous_queries,
            vec!["rope scaling".to_string(), "attention heads".to_string()]
        );
        assert!(provider.get_context("bob").await.unwrap().is_empty());
    }
}
