//! SQLite-based video store.
//!
//! Keyword search runs on an FTS5 index over title, channel and transcript.
//! Similarity search loads stored embeddings and computes cosine similarity
//! in Rust.

use super::query::MatchExpr;
use super::{cosine_similarity, IndexedVideo, Video, VideoStore};
use crate::error::{FinnError, Result};
use crate::search::ResultRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        video_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        channel_name TEXT,
        publish_date TEXT NOT NULL,
        transcript TEXT NOT NULL,
        embedding BLOB,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_videos_channel_id ON videos(channel_id);
    CREATE INDEX IF NOT EXISTS idx_videos_indexed_at ON videos(indexed_at);

    CREATE VIRTUAL TABLE IF NOT EXISTS videos_fts USING fts5(
        video_id UNINDEXED,
        title,
        channel,
        transcript
    );

    CREATE TABLE IF NOT EXISTS search_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        query TEXT NOT NULL,
        searched_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_search_history_user ON search_history(user_id, id);
"#;

/// SQLite-based video store.
pub struct SqliteVideoStore {
    conn: Mutex<Connection>,
}

impl SqliteVideoStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite video store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FinnError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    /// SQL fragment `AND <column> IN (?n, ...)` for a channel filter, numbering
    /// placeholders from `first_param`.
    fn channel_clause(column: &str, channels: &BTreeSet<String>, first_param: usize) -> String {
        if channels.is_empty() {
            return String::new();
        }

        let placeholders: Vec<String> = (0..channels.len())
            .map(|i| format!("?{}", first_param + i))
            .collect();
        format!(" AND {} IN ({})", column, placeholders.join(", "))
    }

    fn write_video(conn: &Connection, video: &Video) -> Result<()> {
        let embedding = if video.embedding.is_empty() {
            None
        } else {
            Some(Self::embedding_to_bytes(&video.embedding))
        };

        conn.execute(
            r#"
            INSERT OR REPLACE INTO videos
            (video_id, title, channel_id, channel_name, publish_date, transcript, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                video.video_id,
                video.title,
                video.channel_id,
                video.channel_name,
                video.publish_date,
                video.transcript,
                embedding,
                video.indexed_at.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "DELETE FROM videos_fts WHERE video_id = ?1",
            params![video.video_id],
        )?;

        let channel_text = match &video.channel_name {
            Some(name) => format!("{} {}", video.channel_id, name),
            None => video.channel_id.clone(),
        };

        conn.execute(
            "INSERT INTO videos_fts (video_id, title, channel, transcript) VALUES (?1, ?2, ?3, ?4)",
            params![video.video_id, video.title, channel_text, video.transcript],
        )?;

        Ok(())
    }
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    async fn upsert(&self, video: &Video) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::write_video(&tx, video)?;
        tx.commit()?;

        debug!("Upserted video {}", video.video_id);
        Ok(())
    }

    #[instrument(skip(self, videos), fields(count = videos.len()))]
    async fn upsert_batch(&self, videos: &[Video]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for video in videos {
            Self::write_video(&tx, video)?;
        }

        tx.commit()?;
        info!("Batch upserted {} videos", videos.len());
        Ok(videos.len())
    }

    #[instrument(skip(self))]
    async fn delete(&self, video_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM videos_fts WHERE video_id = ?1", params![video_id])?;
        let deleted = tx.execute("DELETE FROM videos WHERE video_id = ?1", params![video_id])?;
        tx.commit()?;

        info!("Deleted video {} ({} rows)", video_id, deleted);
        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn get(&self, video_id: &str) -> Result<Option<Video>> {
        let conn = self.lock()?;

        let video = conn
            .query_row(
                r#"
                SELECT video_id, title, channel_id, channel_name, publish_date,
                       transcript, embedding, indexed_at
                FROM videos
                WHERE video_id = ?1
                "#,
                params![video_id],
                |row| {
                    let embedding: Option<Vec<u8>> = row.get(6)?;
                    let indexed_at: String = row.get(7)?;
                    Ok(Video {
                        video_id: row.get(0)?,
                        title: row.get(1)?,
                        channel_id: row.get(2)?,
                        channel_name: row.get(3)?,
                        publish_date: row.get(4)?,
                        transcript: row.get(5)?,
                        embedding: embedding
                            .map(|b| Self::bytes_to_embedding(&b))
                            .unwrap_or_default(),
                        indexed_at: Self::parse_timestamp(&indexed_at),
                    })
                },
            )
            .optional()?;

        Ok(video)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, title, channel_id, publish_date, transcript,
                   embedding IS NOT NULL, indexed_at
            FROM videos
            ORDER BY indexed_at DESC, video_id
            "#,
        )?;

        let videos = stmt
            .query_map([], |row| {
                let transcript: String = row.get(4)?;
                let indexed_at: String = row.get(6)?;
                Ok(IndexedVideo {
                    video_id: row.get(0)?,
                    title: row.get(1)?,
                    channel_id: row.get(2)?,
                    publish_date: row.get(3)?,
                    word_count: transcript.split_whitespace().count(),
                    has_embedding: row.get(5)?,
                    indexed_at: Self::parse_timestamp(&indexed_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(videos)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn embedded_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM videos WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self, expr, channels))]
    async fn keyword_search(
        &self,
        expr: &MatchExpr,
        channels: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<ResultRecord>> {
        let Some(fts_query) = expr.to_fts5() else {
            debug!("Empty match expression, skipping FTS query");
            return Ok(Vec::new());
        };

        let sql = format!(
            r#"
            SELECT v.video_id, v.title, v.channel_id, v.publish_date, bm25(videos_fts) AS bm25_score
            FROM videos_fts
            JOIN videos v ON v.video_id = videos_fts.video_id
            WHERE videos_fts MATCH ?1{}
            ORDER BY bm25_score
            LIMIT {}
            "#,
            Self::channel_clause("v.channel_id", channels, 2),
            limit
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;

        let params: Vec<&str> = std::iter::once(fts_query.as_str())
            .chain(channels.iter().map(String::as_str))
            .collect();

        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let rank: f64 = row.get(4)?;
                // bm25() is lower-is-better; flip it so every source ranks descending.
                Ok(ResultRecord::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    -rank as f32,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(query = %fts_query, "FTS matched {} videos", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self, embedding, channels))]
    async fn similarity_search(
        &self,
        embedding: &[f32],
        channels: &BTreeSet<String>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ResultRecord>> {
        let sql = format!(
            r#"
            SELECT video_id, title, channel_id, publish_date, embedding
            FROM videos
            WHERE embedding IS NOT NULL{}
            "#,
            Self::channel_clause("channel_id", channels, 1)
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;

        let candidates = stmt
            .query_map(params_from_iter(channels.iter()), |row| {
                let bytes: Vec<u8> = row.get(4)?;
                Ok((
                    ResultRecord::new(
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        0.0,
                    ),
                    Self::bytes_to_embedding(&bytes),
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut results: Vec<ResultRecord> = candidates
            .into_iter()
            .map(|(mut record, stored)| {
                record.score = cosine_similarity(embedding, &stored);
                record
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} similar videos", results.len());
        Ok(results)
    }

    async fn record_query(&self, user_id: &str, query: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO search_history (user_id, query, searched_at) VALUES (?1, ?2, ?3)",
            params![user_id, query, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn recent_queries(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT query FROM search_history WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;

        let queries = stmt
            .query_map(params![user_id, limit as i64], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_videos() -> Vec<Video> {
        vec![
            Video::new(
                "vid00000001",
                "Proximal Policy Optimization explained",
                "UCml",
                "2024-01-10",
                "Today we look at PPO, a policy gradient method for reinforcement learning.",
            )
            .with_embedding(vec![1.0, 0.0, 0.0]),
            Video::new(
                "vid00000002",
                "Building agents with tools",
                "UCagents",
                "2024-02-20",
                "Autonomous agents plan and call tools.",
            )
            .with_channel_name("Agent Lab")
            .with_embedding(vec![0.0, 1.0, 0.0]),
            Video::new(
                "vid00000003",
                "Cooking with cast iron",
                "UCfood",
                "2023-11-05",
                "Season the pan before cooking.",
            ),
        ]
    }

    async fn seeded_store() -> SqliteVideoStore {
        let store = SqliteVideoStore::in_memory().unwrap();
        store.upsert_batch(&sample_videos()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_keyword_search() {
        let store = seeded_store().await;

        let results = store
            .keyword_search(&MatchExpr::parse("policy reinforcement"), &BTreeSet::new(), 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "vid00000001");
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_keyword_search_or_and_prefix() {
        let store = seeded_store().await;

        let results = store
            .keyword_search(&MatchExpr::parse("cook* OR agents"), &BTreeSet::new(), 10)
            .await
            .unwrap();

        let ids: BTreeSet<String> = results.into_iter().map(|r| r.id).collect();
        assert!(ids.contains("vid00000002"));
        assert!(ids.contains("vid00000003"));
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_keyword_search_channel_filter() {
        let store = seeded_store().await;
        let channels: BTreeSet<String> = ["UCfood".to_string()].into_iter().collect();

        let results = store
            .keyword_search(&MatchExpr::parse("agents OR pan"), &channels, 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel, "UCfood");
    }

    #[tokio::test]
    async fn test_keyword_search_matches_channel_name() {
        let store = seeded_store().await;

        let results = store
            .keyword_search(&MatchExpr::parse("lab"), &BTreeSet::new(), 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "vid00000002");
    }

    #[tokio::test]
    async fn test_keyword_search_survives_special_characters() {
        let store = seeded_store().await;

        let results = store
            .keyword_search(&MatchExpr::parse("\"PPO: policy\" (gradient"), &BTreeSet::new(), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let empty = store
            .keyword_search(&MatchExpr::parse("::: ***"), &BTreeSet::new(), 10)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_search() {
        let store = seeded_store().await;

        let results = store
            .similarity_search(&[0.9, 0.1, 0.0], &BTreeSet::new(), 10, 0.3)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "vid00000001");
        assert_eq!(store.embedded_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_fts_row() {
        let store = seeded_store().await;

        let updated = Video::new(
            "vid00000003",
            "Cast iron restoration",
            "UCfood",
            "2023-11-05",
            "Remove rust with vinegar.",
        );
        store.upsert(&updated).await.unwrap();

        let old = store
            .keyword_search(&MatchExpr::parse("season"), &BTreeSet::new(), 10)
            .await
            .unwrap();
        assert!(old.is_empty());

        let new = store
            .keyword_search(&MatchExpr::parse("vinegar"), &BTreeSet::new(), 10)
            .await
            .unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_list_delete() {
        let store = seeded_store().await;

        let video = store.get("vid00000002").await.unwrap().unwrap();
        assert_eq!(video.channel_name.as_deref(), Some("Agent Lab"));
        assert_eq!(video.embedding, vec![0.0, 1.0, 0.0]);

        assert_eq!(store.list().await.unwrap().len(), 3);
        assert!(store.delete("vid00000002").await.unwrap());
        assert!(!store.delete("vid00000002").await.unwrap());
        assert!(store.get("vid00000002").await.unwrap().is_none());

        let results = store
            .keyword_search(&MatchExpr::parse("agents"), &BTreeSet::new(), 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_history() {
        let store = SqliteVideoStore::in_memory().unwrap();
        store.record_query("alice", "ppo").await.unwrap();
        store.record_query("bob", "pasta").await.unwrap();
        store.record_query("alice", "grpo").await.unwrap();

        let recent = store.recent_queries("alice", 10).await.unwrap();
        assert_eq!(recent, vec!["grpo".to_string(), "ppo".to_string()]);

        let limited = store.recent_queries("alice", 1).await.unwrap();
        assert_eq!(limited, vec!["grpo".to_string()]);
    }

    #[tokio::test]
    async fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("videos.db");

        {
            let store = SqliteVideoStore::new(&path).unwrap();
            store.upsert_batch(&sample_videos()).await.unwrap();
        }

        let reopened = SqliteVideoStore::new(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);
    }
}
