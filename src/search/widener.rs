//! Progressive query widening.
//!
//! Called after an exact search misses. Rewrites the original query with each
//! strategy in [`WideningTechnique::LADDER`] and re-runs the keyword retriever,
//! stopping at the first rewrite that returns rows.

use super::envelope::{explain, Technique};
use super::expansion::WideningTechnique;
use super::{Provenance, ResultRecord, Retriever};
use crate::config::Vocabulary;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One step of the widening ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideningAttempt {
    pub technique: WideningTechnique,
    pub query: String,
    /// 1-based ladder position.
    pub level: usize,
    pub results: Vec<ResultRecord>,
}

/// Outcome of a widening run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideningResult {
    pub original_query: String,
    /// Rewrite that produced `results`, or the last rewrite tried.
    pub final_query: String,
    /// Successful technique, or `Technique::Exhausted`.
    pub technique: Technique,
    /// Level of the successful technique; number of attempts when exhausted.
    pub level: usize,
    pub results: Vec<ResultRecord>,
    pub explanation: String,
    /// Every rewrite that was executed, in order.
    pub attempts: Vec<WideningAttempt>,
}

impl WideningResult {
    fn exhausted(original_query: &str, final_query: String, attempts: Vec<WideningAttempt>) -> Self {
        let level = attempts.len();
        Self {
            original_query: original_query.to_string(),
            explanation: explain(original_query, &final_query, Technique::Exhausted, level, 0),
            final_query,
            technique: Technique::Exhausted,
            level,
            results: Vec::new(),
            attempts,
        }
    }
}

/// Rewrites a missed query through increasingly permissive strategies.
pub struct QueryWidener {
    vocabulary: Arc<Vocabulary>,
    max_level: usize,
}

impl QueryWidener {
    /// Create a widener that may walk the whole ladder.
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            max_level: WideningTechnique::LADDER.len(),
        }
    }

    /// Cap the number of strategies tried by default.
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level.min(WideningTechnique::LADDER.len());
        self
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// The rewrites this widener would try for `query`, in order.
    pub fn rewrites(&self, query: &str, max_level: usize) -> Vec<(WideningTechnique, String)> {
        WideningTechnique::LADDER
            .iter()
            .take(max_level.min(WideningTechnique::LADDER.len()))
            .map(|technique| (*technique, technique.rewrite(query, &self.vocabulary)))
            .collect()
    }

    /// Walk the ladder against `retriever` until a rewrite returns rows.
    ///
    /// `max_level` overrides the configured cap for this call. Retrieval
    /// errors count as empty attempts; this never fails.
    #[instrument(skip(self, retriever, channels))]
    pub async fn widen_and_search(
        &self,
        retriever: &dyn Retriever,
        query: &str,
        channels: &BTreeSet<String>,
        limit: usize,
        max_level: Option<usize>,
    ) -> WideningResult {
        if query.trim().is_empty() {
            debug!("Empty query, nothing to widen");
            return WideningResult::exhausted(query, query.to_string(), Vec::new());
        }

        let max_level = max_level.unwrap_or(self.max_level);
        let mut attempts: Vec<WideningAttempt> = Vec::new();

        for (technique, rewritten) in self.rewrites(query, max_level) {
            let level = technique.level();
            debug!(%technique, level, query = %rewritten, "Trying widened query");

            let rows = match retriever.search(&rewritten, channels, limit).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(%technique, "Retriever {} failed on widened query: {}", retriever.name(), e);
                    Vec::new()
                }
            };

            let rows: Vec<ResultRecord> = rows
                .into_iter()
                .map(|r| r.with_provenance(Provenance::Widened))
                .collect();

            attempts.push(WideningAttempt {
                technique,
                query: rewritten.clone(),
                level,
                results: rows.clone(),
            });

            if !rows.is_empty() {
                info!(%technique, level, "Widened query matched {} results", rows.len());
                let technique = Technique::Widened(technique);
                return WideningResult {
                    original_query: query.to_string(),
                    explanation: explain(query, &rewritten, technique, level, rows.len()),
                    final_query: rewritten,
                    technique,
                    level,
                    results: rows,
                    attempts,
                };
            }
        }

        let final_query = attempts
            .last()
            .map(|a| a.query.clone())
            .unwrap_or_else(|| query.to_string());

        info!("Widening exhausted after {} attempts", attempts.len());
        WideningResult::exhausted(query, final_query, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::{rows, ScriptedRetriever};
    use std::collections::BTreeMap;

    fn verl_widener() -> QueryWidener {
        let mut synonyms = BTreeMap::new();
        synonyms.insert(
            "verl".to_string(),
            vec![
                "Volcano".to_string(),
                "Engine".to_string(),
                "Reinforcement".to_string(),
                "Learning".to_string(),
            ],
        );
        QueryWidener::new(Arc::new(Vocabulary::new(synonyms, BTreeMap::new())))
    }

    #[tokio::test]
    async fn test_synonym_expansion_succeeds_at_level_one() {
        let retriever = ScriptedRetriever::new().answer(
            "(VERL OR Volcano OR Engine OR Reinforcement OR Learning) volcano engine",
            rows("verl", 3),
        );

        let result = verl_widener()
            .widen_and_search(&retriever, "VERL volcano engine", &BTreeSet::new(), 10, None)
            .await;

        assert_eq!(
            result.technique,
            Technique::Widened(WideningTechnique::SynonymExpansion)
        );
        assert_eq!(result.level, 1);
        assert_eq!(result.results.len(), 3);
        assert_eq!(
            result.final_query,
            "(VERL OR Volcano OR Engine OR Reinforcement OR Learning) volcano engine"
        );
        assert!(result.results.iter().all(|r| r.provenance == Provenance::Widened));
        assert_eq!(retriever.calls(), 1);
    }

    #[tokio::test]
    async fn test_ladder_order_reaches_fuzzy_matching() {
        let widener = QueryWidener::new(Arc::new(Vocabulary::empty()));
        let retriever = ScriptedRetriever::new().answer("policy* OR gradients*", rows("pg", 2));

        let result = widener
            .widen_and_search(&retriever, "policy gradients", &BTreeSet::new(), 10, None)
            .await;

        assert_eq!(
            retriever.seen(),
            vec![
                "policy gradients".to_string(),
                "policy (gradients OR gradient)".to_string(),
                "policy* OR gradients*".to_string(),
            ]
        );
        assert_eq!(result.technique, Technique::Widened(WideningTechnique::FuzzyMatching));
        assert_eq!(result.level, 3);
        assert_eq!(result.attempts.len(), 3);
        assert!(result.attempts[..2].iter().all(|a| a.results.is_empty()));
    }

    #[tokio::test]
    async fn test_high_entropy_query_is_exhausted() {
        let retriever = ScriptedRetriever::new();

        let result = QueryWidener::new(Arc::new(Vocabulary::default()))
            .widen_and_search(&retriever, "qx7Zp9vR2kLm", &BTreeSet::new(), 10, None)
            .await;

        assert_eq!(result.technique, Technique::Exhausted);
        assert!(result.results.is_empty());
        assert_eq!(retriever.calls(), 4);
        assert_eq!(result.level, 4);
        assert_eq!(result.final_query, result.attempts[3].query);
    }

    #[tokio::test]
    async fn test_max_level_bounds_attempts() {
        let retriever = ScriptedRetriever::new();

        let result = QueryWidener::new(Arc::new(Vocabulary::default()))
            .widen_and_search(&retriever, "quick cats", &BTreeSet::new(), 10, Some(2))
            .await;

        assert_eq!(retriever.calls(), 2);
        assert_eq!(result.technique, Technique::Exhausted);
        assert_eq!(result.final_query, "quick (cats OR cat)");
    }

    #[tokio::test]
    async fn test_configured_max_level_is_clamped() {
        let widener = QueryWidener::new(Arc::new(Vocabulary::default())).with_max_level(99);
        assert_eq!(widener.max_level(), 4);

        let retriever = ScriptedRetriever::new();
        widener
            .widen_and_search(&retriever, "abc", &BTreeSet::new(), 10, Some(99))
            .await;
        assert_eq!(retriever.calls(), 4);
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_calls() {
        let retriever = ScriptedRetriever::new();

        let result = QueryWidener::new(Arc::new(Vocabulary::default()))
            .widen_and_search(&retriever, "", &BTreeSet::new(), 10, None)
            .await;

        assert_eq!(result.technique, Technique::Exhausted);
        assert_eq!(result.level, 0);
        assert!(result.attempts.is_empty());
        assert_eq!(retriever.calls(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_errors_do_not_stop_the_ladder() {
        let widener = QueryWidener::new(Arc::new(Vocabulary::empty()));
        let retriever = ScriptedRetriever::new()
            .fail_on("agents")
            .answer("(agents OR agent)", rows("agent", 1));

        let result = widener
            .widen_and_search(&retriever, "agents", &BTreeSet::new(), 10, None)
            .await;

        assert_eq!(result.technique, Technique::Widened(WideningTechnique::Stemming));
        assert_eq!(result.level, 2);
        assert_eq!(retriever.calls(), 2);
    }
}
