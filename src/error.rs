//! Error types for Finn.

use thiserror::Error;

/// Library-level error type for Finn operations.
#[derive(Error, Debug)]
pub enum FinnError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query cannot be searched at all (absent text, zero limit).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A single retrieval attempt failed. Absorbed by the orchestrator.
    #[error("Retrieval failed ({retriever}): {message}")]
    Retrieval { retriever: String, message: String },

    #[error("Video store error: {0}")]
    Store(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Context provider error: {0}")]
    Context(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FinnError {
    /// Build a retrieval error tagged with the retriever that raised it.
    pub fn retrieval(retriever: &str, message: impl Into<String>) -> Self {
        FinnError::Retrieval {
            retriever: retriever.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for Finn operations.
pub type Result<T> = std::result::Result<T, FinnError>;
