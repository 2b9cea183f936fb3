//! Progressive search core.
//!
//! Turns a user query into a ranked, deduplicated result list. Exact keyword
//! search is tried first; semantic retrieval and a ladder of query rewrites
//! are only used when exact search comes up empty or sparse.

mod classify;
mod envelope;
mod expansion;
mod rerank;
mod widener;

pub use classify::is_semantic_query;
pub use envelope::{explain, SearchResultEnvelope, Technique};
pub use expansion::{tokenize, WideningTechnique};
pub use rerank::{deduplicate, merge_results, rerank_with_context};
pub use widener::{QueryWidener, WideningAttempt, WideningResult};

use crate::error::{FinnError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 10;

/// Which retrieval stage produced a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Exact,
    Hybrid,
    Widened,
}

/// One matched video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Video ID.
    pub id: String,
    /// Video title.
    pub title: String,
    /// Channel identifier.
    pub channel: String,
    /// Publish date (ISO 8601 date).
    pub publish_date: String,
    /// Relevance score (higher is better).
    pub score: f32,
    /// Stage that produced this row.
    #[serde(default)]
    pub provenance: Provenance,
}

impl ResultRecord {
    /// Create a result row with `exact` provenance.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        channel: impl Into<String>,
        publish_date: impl Into<String>,
        score: f32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            channel: channel.into(),
            publish_date: publish_date.into(),
            score,
            provenance: Provenance::Exact,
        }
    }

    /// Return the same row stamped with a different provenance.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// A search request. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    text: String,
    channels: BTreeSet<String>,
    limit: usize,
    user_id: Option<String>,
    #[serde(default)]
    max_level: Option<usize>,
}

impl SearchQuery {
    /// Create a query with the default limit and no channel filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channels: BTreeSet::new(),
            limit: DEFAULT_LIMIT,
            user_id: None,
            max_level: None,
        }
    }

    /// Build a query from optional parts, as received from the HTTP and MCP surfaces.
    ///
    /// An absent query text or a zero limit is rejected.
    pub fn from_parts(
        text: Option<String>,
        channels: impl IntoIterator<Item = String>,
        limit: Option<usize>,
        user_id: Option<String>,
    ) -> Result<Self> {
        let text = text.ok_or_else(|| FinnError::InvalidQuery("query is required".to_string()))?;
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(FinnError::InvalidQuery(
                "limit must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            text,
            channels: channels.into_iter().collect(),
            limit,
            user_id,
            max_level: None,
        })
    }

    /// Restrict results to the given channels.
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = String>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    /// Set the result cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Attach the user whose search history feeds context re-ranking.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Cap the widening ladder for this query only.
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = Some(max_level);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Channel filter. Empty means every channel.
    pub fn channels(&self) -> &BTreeSet<String> {
        &self.channels
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn max_level(&self) -> Option<usize> {
        self.max_level
    }

    /// Check the query can be searched at all.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(FinnError::InvalidQuery(
                "limit must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single retrieval backend.
///
/// Rows come back best first. An empty list means "no matches"; errors are
/// reserved for faults (unavailable index, malformed query, network).
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run one retrieval call.
    async fn search(
        &self,
        query: &str,
        channels: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<ResultRecord>>;
}
