//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for search and browsing the video library.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::FinnError;
use crate::library::Library;
use crate::search::SearchQuery;
use crate::store::IndexedVideo;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    library: Library,
    default_limit: usize,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let library = Library::open(&settings).await?;

    let state = Arc::new(AppState {
        library,
        default_limit: settings.search.default_limit,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Finn API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search", "POST /search");
    Output::kv("List Videos", "GET  /videos");
    Output::kv("Get Video", "GET  /videos/{video_id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/videos", get(list_videos))
        .route("/videos/{video_id}", get(get_video))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SearchRequest {
    query: Option<String>,
    #[serde(default)]
    channels: Vec<String>,
    limit: Option<usize>,
    user_id: Option<String>,
    max_level: Option<usize>,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<IndexedVideo>,
    total: usize,
}

#[derive(Serialize)]
struct VideoDetailResponse {
    video_id: String,
    title: String,
    channel_id: String,
    channel_name: Option<String>,
    publish_date: String,
    url: String,
    word_count: usize,
    transcript: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(error: FinnError) -> Response {
    let status = match &error {
        FinnError::InvalidQuery(_) | FinnError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        FinnError::VideoNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!("Request failed: {}", error);
    }

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn search(State(state): State<Arc<AppState>>, Json(req): Json<SearchRequest>) -> Response {
    let query = match SearchQuery::from_parts(
        req.query,
        req.channels,
        req.limit.or(Some(state.default_limit)),
        req.user_id,
    ) {
        Ok(query) => match req.max_level {
            Some(level) => query.with_max_level(level),
            None => query,
        },
        Err(e) => return error_response(e),
    };

    match state.library.search(&query).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_videos(State(state): State<Arc<AppState>>) -> Response {
    match state.library.list().await {
        Ok(videos) => Json(VideoListResponse {
            total: videos.len(),
            videos,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_video(State(state): State<Arc<AppState>>, Path(video_id): Path<String>) -> Response {
    match state.library.get(&video_id).await {
        Ok(video) => Json(VideoDetailResponse {
            url: video.url(),
            word_count: video.transcript.split_whitespace().count(),
            video_id: video.video_id,
            title: video.title,
            channel_id: video.channel_id,
            channel_name: video.channel_name,
            publish_date: video.publish_date,
            transcript: video.transcript,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryVideoStore, Video, VideoStore};

    async fn state() -> Arc<AppState> {
        let store: Arc<dyn VideoStore> = Arc::new(MemoryVideoStore::new());
        store
            .upsert(&Video::new(
                "aaaaaaaaaaa",
                "Proximal policy optimization",
                "UCml",
                "2024-01-01",
                "PPO clips the policy update.",
            ))
            .await
            .unwrap();

        let library = Library::with_store(&Settings::default(), store, None)
            .await
            .unwrap();
        Arc::new(AppState {
            library,
            default_limit: 10,
        })
    }

    fn request(body: serde_json::Value) -> Json<SearchRequest> {
        Json(serde_json::from_value(body).unwrap())
    }

    #[tokio::test]
    async fn test_search_returns_envelope() {
        let response = search(
            State(state().await),
            request(serde_json::json!({"query": "ppo", "channels": ["UCml"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_query_is_bad_request() {
        let response = search(State(state().await), request(serde_json::json!({"limit": 3}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = search(
            State(state().await),
            request(serde_json::json!({"query": "ppo", "limit": 0})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_video() {
        let found = get_video(State(state().await), Path("aaaaaaaaaaa".to_string())).await;
        assert_eq!(found.status(), StatusCode::OK);

        let missing = get_video(State(state().await), Path("zzzzzzzzzzz".to_string())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _router = router(state().await);
        let listed = list_videos(State(state().await)).await;
        assert_eq!(listed.status(), StatusCode::OK);
    }
}
