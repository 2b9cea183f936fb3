//! The video library: a store plus the search pipeline built over it.
//!
//! This is what the CLI, HTTP server and MCP server talk to.

use crate::config::{Settings, Vocabulary};
use crate::context::HistoryContextProvider;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{FinnError, Result};
use crate::orchestrator::{Capabilities, SearchOrchestrator};
use crate::retriever::{KeywordRetriever, SemanticRetriever};
use crate::search::{QueryWidener, SearchQuery, SearchResultEnvelope};
use crate::store::{IndexedVideo, SqliteVideoStore, Video, VideoStore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

/// One video as found in an import file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoImport {
    /// YouTube URL or bare video ID.
    pub video: String,
    pub title: String,
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: Option<String>,
    pub publish_date: String,
    pub transcript: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub embedded: usize,
    /// Entries skipped because their video reference was not recognised.
    pub skipped: Vec<String>,
}

/// Extracts YouTube video IDs from URLs and bare IDs.
pub struct VideoIdParser {
    bare_id: Regex,
}

impl VideoIdParser {
    pub fn new() -> Result<Self> {
        let bare_id = Regex::new(r"^[a-zA-Z0-9_-]{11}$")
            .map_err(|e| FinnError::InvalidInput(format!("Invalid video ID pattern: {}", e)))?;
        Ok(Self { bare_id })
    }

    /// Video ID of a watch/short/embed URL or a bare 11-character ID.
    pub fn parse(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if self.bare_id.is_match(input) {
            return Some(input.to_string());
        }

        let url = Url::parse(input)
            .or_else(|_| Url::parse(&format!("https://{}", input)))
            .ok()?;
        let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

        let candidate = match host {
            "youtu.be" => url.path_segments()?.next().map(str::to_string),
            "youtube.com" => {
                let mut segments = url.path_segments()?;
                match segments.next() {
                    Some("watch") => url
                        .query_pairs()
                        .find(|(k, _)| k == "v")
                        .map(|(_, v)| v.into_owned()),
                    Some("embed") | Some("v") | Some("shorts") | Some("live") => {
                        segments.next().map(str::to_string)
                    }
                    _ => None,
                }
            }
            _ => None,
        }?;

        self.bare_id.is_match(&candidate).then_some(candidate)
    }
}

impl Capabilities {
    /// Hybrid search needs it enabled in config, an embedder, and at least
    /// one embedded video.
    pub async fn resolve(
        settings: &Settings,
        store: &dyn VideoStore,
        embedder: Option<&Arc<dyn Embedder>>,
    ) -> Result<Self> {
        let hybrid_search_available = settings.search.hybrid_enabled
            && embedder.is_some()
            && store.embedded_count().await? > 0;

        Ok(Self {
            hybrid_search_available,
        })
    }
}

/// A video store with its search pipeline.
pub struct Library {
    store: Arc<dyn VideoStore>,
    embedder: Option<Arc<dyn Embedder>>,
    orchestrator: SearchOrchestrator,
}

impl Library {
    /// Open the SQLite library configured in `settings`.
    pub async fn open(settings: &Settings) -> Result<Self> {
        let store: Arc<dyn VideoStore> = Arc::new(SqliteVideoStore::new(&settings.sqlite_path())?);

        let embedder = if settings.search.hybrid_enabled {
            Some(create_embedder(&settings.embedding)?)
        } else {
            None
        };

        Self::with_store(settings, store, embedder).await
    }

    /// Build a library over an existing store and optional embedder.
    pub async fn with_store(
        settings: &Settings,
        store: Arc<dyn VideoStore>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        let vocabulary = Vocabulary::load(settings.vocabulary_path().as_deref())?;
        let widener = QueryWidener::new(Arc::new(vocabulary))
            .with_max_level(settings.search.max_widening_level);

        let capabilities = Capabilities::resolve(settings, store.as_ref(), embedder.as_ref()).await?;
        info!(
            hybrid = capabilities.hybrid_search_available,
            "Resolved search capabilities"
        );

        let mut orchestrator =
            SearchOrchestrator::new(Arc::new(KeywordRetriever::new(store.clone())), widener)
                .with_settings(&settings.search)
                .with_context_provider(Arc::new(HistoryContextProvider::new(
                    store.clone(),
                    settings.search.history_depth,
                )));

        if let Some(embedder) = &embedder {
            orchestrator = orchestrator.with_hybrid(
                Arc::new(SemanticRetriever::new(
                    store.clone(),
                    embedder.clone(),
                    settings.search.min_similarity,
                )),
                capabilities,
            );
        }

        Ok(Self {
            store,
            embedder,
            orchestrator,
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        self.orchestrator.capabilities()
    }

    pub fn store(&self) -> &Arc<dyn VideoStore> {
        &self.store
    }

    /// Search the library. Queries from a known user are added to their history.
    #[instrument(skip(self, query), fields(query = %query.text()))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResultEnvelope> {
        let envelope = self.orchestrator.search(query).await?;

        if let Some(user_id) = query.user_id() {
            if !query.text().trim().is_empty() {
                if let Err(e) = self.store.record_query(user_id, query.text()).await {
                    warn!("Failed to record search history: {}", e);
                }
            }
        }

        Ok(envelope)
    }

    /// Import videos, optionally embedding title and transcript.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn import(&self, items: Vec<VideoImport>, embed: bool) -> Result<ImportSummary> {
        let parser = VideoIdParser::new()?;
        let mut summary = ImportSummary::default();
        let mut videos = Vec::with_capacity(items.len());

        for item in items {
            let Some(video_id) = parser.parse(&item.video) else {
                warn!("Skipping unrecognised video reference: {}", item.video);
                summary.skipped.push(item.video);
                continue;
            };

            let mut video = Video::new(
                video_id,
                item.title,
                item.channel_id,
                item.publish_date,
                item.transcript,
            );
            video.channel_name = item.channel_name;
            videos.push(video);
        }

        if embed && !videos.is_empty() {
            let embedder = self.embedder.as_ref().ok_or_else(|| {
                FinnError::Config("Embedding requested but hybrid search is disabled".to_string())
            })?;

            let texts: Vec<String> = videos.iter().map(Video::embedding_text).collect();
            let embeddings = embedder.embed_batch(&texts).await?;
            if embeddings.len() != videos.len() {
                return Err(FinnError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    videos.len(),
                    embeddings.len()
                )));
            }

            for (video, embedding) in videos.iter_mut().zip(embeddings) {
                video.embedding = embedding;
            }
            summary.embedded = videos.len();
        }

        summary.imported = self.store.upsert_batch(&videos).await?;
        info!(
            imported = summary.imported,
            embedded = summary.embedded,
            skipped = summary.skipped.len(),
            "Import finished"
        );
        Ok(summary)
    }

    pub async fn list(&self) -> Result<Vec<IndexedVideo>> {
        self.store.list().await
    }

    /// Get a video by ID, or `VideoNotFound`.
    pub async fn get(&self, video_id: &str) -> Result<Video> {
        self.store
            .get(video_id)
            .await?
            .ok_or_else(|| FinnError::VideoNotFound(video_id.to_string()))
    }
}
