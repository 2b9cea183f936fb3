//! Search orchestrator for Finn.
//!
//! Runs the progressive search: exact keyword retrieval, then hybrid
//! retrieval when exact search is empty or sparse for a semantic query, then
//! the widening ladder. Every attempt is awaited before the next decision.

use crate::config::SearchSettings;
use crate::context::{ContextProvider, SearchContext};
use crate::error::Result;
use crate::search::{
    deduplicate, is_semantic_query, merge_results, rerank_with_context, Provenance,
    QueryWidener, ResultRecord, Retriever, SearchQuery, SearchResultEnvelope, Technique,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Optional collaborators, resolved once when the orchestrator is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// A hybrid retriever is configured and has embeddings to search.
    pub hybrid_search_available: bool,
}

/// Composes the base retriever, optional hybrid retriever and query widener.
pub struct SearchOrchestrator {
    base: Arc<dyn Retriever>,
    hybrid: Option<Arc<dyn Retriever>>,
    widener: QueryWidener,
    context_provider: Option<Arc<dyn ContextProvider>>,
    capabilities: Capabilities,
    sparse_threshold: usize,
    context_boost: f32,
}

impl SearchOrchestrator {
    /// Create an orchestrator without hybrid retrieval or a context provider.
    pub fn new(base: Arc<dyn Retriever>, widener: QueryWidener) -> Self {
        let defaults = SearchSettings::default();
        Self {
            base,
            hybrid: None,
            widener,
            context_provider: None,
            capabilities: Capabilities::default(),
            sparse_threshold: defaults.sparse_threshold,
            context_boost: defaults.context_boost,
        }
    }

    /// Attach a hybrid retriever. It is only called when `capabilities` allows it.
    pub fn with_hybrid(mut self, hybrid: Arc<dyn Retriever>, capabilities: Capabilities) -> Self {
        self.hybrid = Some(hybrid);
        self.capabilities = capabilities;
        self
    }

    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context_provider = Some(provider);
        self
    }

    /// Apply the sparse threshold and context boost from settings.
    pub fn with_settings(mut self, settings: &SearchSettings) -> Self {
        self.sparse_threshold = settings.sparse_threshold;
        self.context_boost = settings.context_boost;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn hybrid(&self) -> Option<&dyn Retriever> {
        if self.capabilities.hybrid_search_available {
            self.hybrid.as_deref()
        } else {
            None
        }
    }

    /// Run a search, fetching the user's context from the context provider.
    ///
    /// A failing context provider is logged and the search runs without
    /// re-ranking.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResultEnvelope> {
        query.validate()?;

        let context = match (query.user_id(), &self.context_provider) {
            (Some(user_id), Some(provider)) => match provider.get_context(user_id).await {
                Ok(context) => Some(context),
                Err(e) => {
                    warn!("Context provider failed for {}: {}", user_id, e);
                    None
                }
            },
            _ => None,
        };

        self.search_with_context(query, context.as_ref()).await
    }

    /// Run a search with an explicitly supplied context.
    ///
    /// Only an invalid query is an error. Retrieval failures count as empty
    /// attempts, and a search that finds nothing returns an `exhausted`
    /// envelope.
    #[instrument(skip(self, query, context), fields(query = %query.text(), limit = query.limit()))]
    pub async fn search_with_context(
        &self,
        query: &SearchQuery,
        context: Option<&SearchContext>,
    ) -> Result<SearchResultEnvelope> {
        query.validate()?;

        let text = query.text();
        if text.trim().is_empty() {
            debug!("Empty query, skipping retrieval");
            return Ok(SearchResultEnvelope::exhausted(text, text, 0));
        }

        let channels = query.channels();
        let limit = query.limit();

        let base_rows = attempt(self.base.as_ref(), text, channels, limit, Provenance::Exact).await;
        let sparse = base_rows.len() < self.sparse_threshold;

        let (technique, level, final_query, rows) =
            if !base_rows.is_empty() && !(sparse && is_semantic_query(text)) {
                (Technique::Exact, 0, text.to_string(), base_rows)
            } else {
                let hybrid_rows = match self.hybrid() {
                    Some(hybrid) => attempt(hybrid, text, channels, limit, Provenance::Hybrid).await,
                    None => {
                        debug!("Hybrid search unavailable");
                        Vec::new()
                    }
                };

                if !hybrid_rows.is_empty() {
                    (
                        Technique::Hybrid,
                        0,
                        text.to_string(),
                        merge_results(vec![base_rows, hybrid_rows]),
                    )
                } else if !base_rows.is_empty() {
                    (Technique::Exact, 0, text.to_string(), base_rows)
                } else {
                    let widened = self
                        .widener
                        .widen_and_search(self.base.as_ref(), text, channels, limit, query.max_level())
                        .await;
                    (widened.technique, widened.level, widened.final_query, widened.results)
                }
            };

        let rows = match context {
            Some(context) => rerank_with_context(rows, &context.entities(), self.context_boost),
            None => rows,
        };

        let mut rows = deduplicate(rows);
        rows.truncate(limit);

        info!(
            technique = %technique,
            level,
            "Search for '{}' returned {} results",
            text,
            rows.len()
        );

        Ok(SearchResultEnvelope::new(text, final_query, technique, level, rows))
    }
}

/// One retrieval attempt. Errors are logged and count as zero rows.
async fn attempt(
    retriever: &dyn Retriever,
    query: &str,
    channels: &BTreeSet<String>,
    limit: usize,
    provenance: Provenance,
) -> Vec<ResultRecord> {
    match retriever.search(query, channels, limit).await {
        Ok(rows) => rows
            .into_iter()
            .map(|r| r.with_provenance(provenance))
            .collect(),
        Err(e) => {
            warn!("Retriever {} failed: {}", retriever.name(), e);
            Vec::new()
        }
    }
}
