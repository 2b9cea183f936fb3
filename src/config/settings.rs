//! Configuration settings for Finn.

use crate::error::FinnError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub store: StoreSettings,
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.finn".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Video store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.finn/videos.db".to_string(),
        }
    }
}

/// Search pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results returned when the caller gives no limit.
    pub default_limit: usize,
    /// Exact-match row count below which semantic queries also try hybrid search.
    pub sparse_threshold: usize,
    /// Score added to rows matching the caller's search context.
    pub context_boost: f32,
    /// Number of widening strategies to try (1-4).
    pub max_widening_level: usize,
    /// Allow the embedding-backed hybrid retriever.
    pub hybrid_enabled: bool,
    /// Minimum cosine similarity for hybrid results.
    pub min_similarity: f32,
    /// Number of previous queries used as search context.
    pub history_depth: usize,
    /// Optional TOML file extending the synonym/concept tables.
    pub vocabulary_path: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            sparse_threshold: 3,
            context_boost: 0.5,
            max_widening_level: 4,
            hybrid_enabled: true,
            min_similarity: 0.3,
            history_depth: 20,
            vocabulary_path: None,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI embeddings API (default).
    #[default]
    OpenAI,
    /// Local Ollama server.
    Ollama,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "ollama" => Ok(EmbeddingProvider::Ollama),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::OpenAI => write!(f, "openai"),
            EmbeddingProvider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, ollama).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions (OpenAI only).
    pub dimensions: u32,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            ollama_url: "http://localhost:11434".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| FinnError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finn")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Set a single `section.key` value, checking the result still parses.
    pub fn set(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            FinnError::Config(format!("Expected <section>.<key>, got '{}'", key))
        })?;

        let mut root =
            toml::Value::try_from(&*self).map_err(|e| FinnError::Config(e.to_string()))?;
        let table = root
            .get_mut(section)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| FinnError::Config(format!("Unknown section: {}", section)))?;

        let parsed = match table.get(field) {
            Some(toml::Value::String(_)) => toml::Value::String(value.to_string()),
            _ => parse_scalar(value),
        };
        table.insert(field.to_string(), parsed);

        let updated: Settings = root
            .try_into()
            .map_err(|e| FinnError::Config(format!("Invalid value for {}: {}", key, e)))?;

        // Unknown keys are dropped by deserialization; make sure ours survived.
        let check =
            toml::Value::try_from(&updated).map_err(|e| FinnError::Config(e.to_string()))?;
        if check.get(section).and_then(|s| s.get(field)).is_none() {
            return Err(FinnError::Config(format!("Unknown key: {}", key)));
        }

        *self = updated;
        Ok(())
    }

    /// Get the expanded vocabulary file path, if configured.
    pub fn vocabulary_path(&self) -> Option<PathBuf> {
        self.search
            .vocabulary_path
            .as_deref()
            .map(Self::expand_path)
    }
}

fn parse_scalar(value: &str) -> toml::Value {
    if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[search]
sparse_threshold = 5

[embedding]
provider = "ollama"
model = "nomic-embed-text"
"#,
        )
        .unwrap();

        assert_eq!(settings.search.sparse_threshold, 5);
        assert_eq!(settings.search.default_limit, 10);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(settings.store.sqlite_path, "~/.finn/videos.db");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.search.context_boost = 1.25;
        settings.search.vocabulary_path = Some("~/vocab.toml".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(path.as_path())).unwrap();
        assert_eq!(loaded.search.context_boost, 1.25);
        assert!(loaded.vocabulary_path().is_some());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = PathBuf::from("/nonexistent/finn/config.toml");
        let settings = Settings::load_from(Some(path.as_path())).unwrap();
        assert!(settings.search.hybrid_enabled);
    }

    #[test]
    fn test_set_values() {
        let mut settings = Settings::default();

        settings.set("search.sparse_threshold", "5").unwrap();
        settings.set("search.context_boost", "1").unwrap();
        settings.set("search.hybrid_enabled", "false").unwrap();
        settings.set("embedding.provider", "ollama").unwrap();
        settings.set("search.vocabulary_path", "~/vocab.toml").unwrap();

        assert_eq!(settings.search.sparse_threshold, 5);
        assert_eq!(settings.search.context_boost, 1.0);
        assert!(!settings.search.hybrid_enabled);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(settings.search.vocabulary_path.as_deref(), Some("~/vocab.toml"));
    }

    #[test]
    fn test_set_rejects_bad_keys_and_values() {
        let mut settings = Settings::default();

        assert!(settings.set("sparse_threshold", "5").is_err());
        assert!(settings.set("nope.key", "5").is_err());
        assert!(settings.set("search.nope", "5").is_err());
        assert!(settings.set("search.sparse_threshold", "many").is_err());
        assert!(settings.set("embedding.provider", "cohere").is_err());
        assert_eq!(settings.search.sparse_threshold, 3);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Ollama".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Ollama);
        assert!("cohere".parse::<EmbeddingProvider>().is_err());
        assert_eq!(EmbeddingProvider::OpenAI.to_string(), "openai");
    }
}
