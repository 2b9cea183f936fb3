//! Video store abstraction for Finn.
//!
//! Stores video metadata, transcripts and optional embeddings, and answers
//! keyword and similarity searches over them. Also keeps per-user search
//! history for context re-ranking.

mod memory;
mod query;
mod sqlite;

pub use memory::MemoryVideoStore;
pub use query::{AnyOf, MatchExpr, Term};
pub(crate) use query::words_of;
pub use sqlite::SqliteVideoStore;

use crate::error::Result;
use crate::search::ResultRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A video stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// YouTube video ID.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Channel identifier.
    pub channel_id: String,
    /// Human-readable channel name, if known.
    pub channel_name: Option<String>,
    /// Publish date (ISO 8601 date).
    pub publish_date: String,
    /// Full transcript text.
    pub transcript: String,
    /// Embedding of title + transcript. Empty when not embedded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// When this video was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video record without an embedding.
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        channel_id: impl Into<String>,
        publish_date: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            channel_id: channel_id.into(),
            channel_name: None,
            publish_date: publish_date.into(),
            transcript: transcript.into(),
            embedding: Vec::new(),
            indexed_at: Utc::now(),
        }
    }

    /// Attach a channel display name.
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Text used to compute this video's embedding.
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.transcript)
    }

    /// Watch URL on YouTube.
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }

    /// Convert to a search result row with the given score.
    pub fn to_record(&self, score: f32) -> ResultRecord {
        ResultRecord::new(
            self.video_id.clone(),
            self.title.clone(),
            self.channel_id.clone(),
            self.publish_date.clone(),
            score,
        )
    }
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub publish_date: String,
    /// Transcript length in words.
    pub word_count: usize,
    pub has_embedding: bool,
    pub indexed_at: DateTime<Utc>,
}

impl From<&Video> for IndexedVideo {
    fn from(video: &Video) -> Self {
        Self {
            video_id: video.video_id.clone(),
            title: video.title.clone(),
            channel_id: video.channel_id.clone(),
            publish_date: video.publish_date.clone(),
            word_count: video.transcript.split_whitespace().count(),
            has_embedding: !video.embedding.is_empty(),
            indexed_at: video.indexed_at,
        }
    }
}

/// Trait for video store implementations.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Insert or replace a video.
    async fn upsert(&self, video: &Video) -> Result<()>;

    /// Bulk upsert videos.
    async fn upsert_batch(&self, videos: &[Video]) -> Result<usize>;

    /// Delete a video. Returns whether it existed.
    async fn delete(&self, video_id: &str) -> Result<bool>;

    /// Get a video by ID.
    async fn get(&self, video_id: &str) -> Result<Option<Video>>;

    /// List all indexed videos, most recently indexed first.
    async fn list(&self) -> Result<Vec<IndexedVideo>>;

    /// Total number of videos.
    async fn count(&self) -> Result<usize>;

    /// Number of videos with an embedding.
    async fn embedded_count(&self) -> Result<usize>;

    /// Full-text search, best match first. Scores are higher-is-better.
    async fn keyword_search(
        &self,
        expr: &MatchExpr,
        channels: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<ResultRecord>>;

    /// Embedding similarity search, most similar first.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        channels: &BTreeSet<String>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ResultRecord>>;

    /// Append a query to a user's search history.
    async fn record_query(&self, user_id: &str, query: &str) -> Result<()>;

    /// Most recent queries of a user, newest first.
    async fn recent_queries(&self, user_id: &str, limit: usize) -> Result<Vec<String>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
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

/// Whether `channel` passes a channel filter. An empty filter allows everything.
pub(crate) fn channel_allowed(channels: &BTreeSet<String>, channel: &str) -> bool {
    channels.is_empty() || channels.contains(channel)
}
