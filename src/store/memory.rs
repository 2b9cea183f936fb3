//! In-memory video store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    channel_allowed, cosine_similarity, words_of, IndexedVideo, MatchExpr, Video, VideoStore,
};
use crate::error::{FinnError, Result};
use crate::search::ResultRecord;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory video store.
pub struct MemoryVideoStore {
    videos: RwLock<HashMap<String, Video>>,
    history: RwLock<Vec<(String, String)>>,
}

impl MemoryVideoStore {
    /// Create a new in-memory video store.
    pub fn new() -> Self {
        Self {
            videos: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Video>>> {
        self.videos
            .read()
            .map_err(|e| FinnError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Video>>> {
        self.videos
            .write()
            .map_err(|e| FinnError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVideoStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_descending(results: &mut Vec<ResultRecord>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(limit);
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn upsert(&self, video: &Video) -> Result<()> {
        let mut videos = self.write()?;
        videos.insert(video.video_id.clone(), video.clone());
        Ok(())
    }

    async fn upsert_batch(&self, batch: &[Video]) -> Result<usize> {
        let mut videos = self.write()?;
        for video in batch {
            videos.insert(video.video_id.clone(), video.clone());
        }
        Ok(batch.len())
    }

    async fn delete(&self, video_id: &str) -> Result<bool> {
        let mut videos = self.write()?;
        Ok(videos.remove(video_id).is_some())
    }

    async fn get(&self, video_id: &str) -> Result<Option<Video>> {
        let videos = self.read()?;
        Ok(videos.get(video_id).cloned())
    }

    async fn list(&self) -> Result<Vec<IndexedVideo>> {
        let videos = self.read()?;
        let mut list: Vec<IndexedVideo> = videos.values().map(IndexedVideo::from).collect();
        list.sort_by(|a, b| {
            b.indexed_at
                .cmp(&a.indexed_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        Ok(list)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn embedded_count(&self) -> Result<usize> {
        let videos = self.read()?;
        Ok(videos.values().filter(|v| !v.embedding.is_empty()).count())
    }

    async fn keyword_search(
        &self,
        expr: &MatchExpr,
        channels: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<ResultRecord>> {
        if expr.is_empty() {
            return Ok(Vec::new());
        }

        let videos = self.read()?;

        let mut results: Vec<ResultRecord> = videos
            .values()
            .filter(|v| channel_allowed(channels, &v.channel_id))
            .filter_map(|v| {
                let text = format!(
                    "{} {} {} {}",
                    v.title,
                    v.channel_id,
                    v.channel_name.as_deref().unwrap_or_default(),
                    v.transcript
                );
                expr.score_words(&words_of(&text)).map(|score| v.to_record(score))
            })
            .collect();

        sort_descending(&mut results, limit);
        Ok(results)
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        channels: &BTreeSet<String>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ResultRecord>> {
        let videos = self.read()?;

        let mut results: Vec<ResultRecord> = videos
            .values()
            .filter(|v| !v.embedding.is_empty() && channel_allowed(channels, &v.channel_id))
            .map(|v| v.to_record(cosine_similarity(embedding, &v.embedding)))
            .filter(|r| r.score >= min_score)
            .collect();

        sort_descending(&mut results, limit);
        Ok(results)
    }

    async fn record_query(&self, user_id: &str, query: &str) -> Result<()> {
        let mut history = self
            .history
            .write()
            .map_err(|e| FinnError::Store(format!("Failed to acquire lock: {}", e)))?;
        history.push((user_id.to_string(), query.to_string()));
        Ok(())
    }

    async fn recent_queries(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let history = self
            .history
            .read()
            .map_err(|e| FinnError::Store(format!("Failed to acquire lock: {}", e)))?;

        Ok(history
            .iter()
            .rev()
            .filter(|(user, _)| user == user_id)
            .take(limit)
            .map(|(_, query)| query.clone())
            .collect())
    }
}
