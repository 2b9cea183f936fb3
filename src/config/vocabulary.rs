//! Synonym and concept tables used by query widening.
//!
//! The built-in tables cover common AI/ML vocabulary. A TOML file can extend
//! or replace them:
//!
//! ```toml
//! replace_defaults = false
//!
//! [synonyms]
//! verl = ["Volcano", "Engine", "Reinforcement", "Learning"]
//!
//! [concepts]
//! agent = ["autonomous", "planning", "tool"]
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Lookup tables for synonym and semantic expansion.
///
/// Keys are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    synonyms: BTreeMap<String, Vec<String>>,
    concepts: BTreeMap<String, Vec<String>>,
}

/// On-disk vocabulary file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VocabularyFile {
    replace_defaults: bool,
    synonyms: BTreeMap<String, Vec<String>>,
    concepts: BTreeMap<String, Vec<String>>,
}

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("verl", &["Volcano", "Engine", "Reinforcement", "Learning"]),
    ("rl", &["reinforcement", "learning"]),
    ("rlhf", &["reinforcement", "learning", "human", "feedback"]),
    ("ppo", &["proximal", "policy", "optimization"]),
    ("grpo", &["group", "relative", "policy", "optimization"]),
    ("dpo", &["direct", "preference", "optimization"]),
    ("llm", &["large", "language", "model"]),
    ("llms", &["large", "language", "models"]),
    ("ai", &["artificial", "intelligence"]),
    ("ml", &["machine", "learning"]),
    ("nlp", &["natural", "language", "processing"]),
    ("rag", &["retrieval", "augmented", "generation"]),
    ("gpu", &["graphics", "processing", "unit"]),
    ("api", &["application", "programming", "interface"]),
    ("mcp", &["model", "context", "protocol"]),
    ("moe", &["mixture", "experts"]),
    ("sft", &["supervised", "fine-tuning"]),
    ("cot", &["chain", "thought"]),
];

const DEFAULT_CONCEPTS: &[(&str, &[&str])] = &[
    ("agent", &["autonomous", "planning", "tool"]),
    ("agents", &["autonomous", "planning", "tools"]),
    ("learning", &["training", "education"]),
    ("training", &["fine-tuning", "optimization"]),
    ("transformer", &["attention", "architecture"]),
    ("attention", &["transformer", "context"]),
    ("reasoning", &["logic", "inference", "chain-of-thought"]),
    ("model", &["network", "architecture"]),
    ("search", &["retrieval", "query", "index"]),
    ("retrieval", &["search", "embedding"]),
    ("database", &["storage", "query", "index"]),
    ("optimization", &["tuning", "efficiency"]),
    ("inference", &["serving", "latency"]),
    ("video", &["tutorial", "lecture"]),
    ("reward", &["feedback", "signal"]),
    ("policy", &["strategy", "behavior"]),
];

fn table(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(key, terms)| {
            (
                key.to_string(),
                terms.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

fn lowercase_keys(map: BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    map.into_iter()
        .map(|(key, terms)| (key.to_lowercase(), terms))
        .collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            synonyms: table(DEFAULT_SYNONYMS),
            concepts: table(DEFAULT_CONCEPTS),
        }
    }
}

impl Vocabulary {
    /// Build a vocabulary from explicit tables.
    pub fn new(
        synonyms: BTreeMap<String, Vec<String>>,
        concepts: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            synonyms: lowercase_keys(synonyms),
            concepts: lowercase_keys(concepts),
        }
    }

    /// A vocabulary with no entries. Synonym and semantic expansion become no-ops.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), BTreeMap::new())
    }

    /// Load the built-in tables, merged with an optional override file.
    ///
    /// A missing file is not an error; the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut vocabulary = Self::default();

        let Some(path) = path else {
            return Ok(vocabulary);
        };

        if !path.exists() {
            debug!("No vocabulary file at {:?}, using defaults", path);
            return Ok(vocabulary);
        }

        let content = std::fs::read_to_string(path)?;
        let file: VocabularyFile = toml::from_str(&content)?;

        if file.replace_defaults {
            vocabulary = Self::empty();
        }
        vocabulary.synonyms.extend(lowercase_keys(file.synonyms));
        vocabulary.concepts.extend(lowercase_keys(file.concepts));

        info!(
            "Loaded vocabulary from {:?} ({} synonyms, {} concepts)",
            path,
            vocabulary.synonyms.len(),
            vocabulary.concepts.len()
        );

        Ok(vocabulary)
    }

    /// Expansions for an acronym or jargon token.
    pub fn synonyms(&self, token: &str) -> &[String] {
        self.synonyms
            .get(&token.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Terms associated with a concept token.
    pub fn concepts(&self, token: &str) -> &[String] {
        self.concepts
            .get(&token.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let vocabulary = Vocabulary::default();
        assert_eq!(vocabulary.synonyms("VERL"), vocabulary.synonyms("verl"));
        assert_eq!(vocabulary.synonyms("Verl").len(), 4);
        assert!(vocabulary.synonyms("zzqx").is_empty());
        assert!(vocabulary.concepts("AGENT").contains(&"planning".to_string()));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let vocabulary = Vocabulary::load(Some(Path::new("/nonexistent/vocab.toml"))).unwrap();
        assert_eq!(vocabulary, Vocabulary::default());
    }

    #[test]
    fn test_load_extends_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[synonyms]
K8S = ["kubernetes"]

[concepts]
rust = ["ownership", "borrowing"]
"#
        )
        .unwrap();

        let vocabulary = Vocabulary::load(Some(file.path())).unwrap();
        assert_eq!(vocabulary.synonyms("k8s"), &["kubernetes".to_string()]);
        assert_eq!(vocabulary.concepts("Rust").len(), 2);
        assert!(!vocabulary.synonyms("ppo").is_empty());
    }

    #[test]
    fn test_load_can_replace_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
replace_defaults = true

[synonyms]
k8s = ["kubernetes"]
"#
        )
        .unwrap();

        let vocabulary = Vocabulary::load(Some(file.path())).unwrap();
        assert!(vocabulary.synonyms("ppo").is_empty());
        assert!(vocabulary.concepts("agent").is_empty());
        assert_eq!(vocabulary.synonyms("K8S").len(), 1);
    }
}
