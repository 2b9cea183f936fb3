//! The search result envelope returned to callers.

use super::expansion::WideningTechnique;
use super::ResultRecord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Technique that produced the final results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    Exact,
    Hybrid,
    Widened(WideningTechnique),
    Exhausted,
}

impl Technique {
    pub fn name(&self) -> &'static str {
        match self {
            Technique::Exact => "exact",
            Technique::Hybrid => "hybrid",
            Technique::Widened(t) => t.name(),
            Technique::Exhausted => "exhausted",
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Technique::Exhausted)
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Technique {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Technique::Exact),
            "hybrid" => Ok(Technique::Hybrid),
            "exhausted" => Ok(Technique::Exhausted),
            other => other.parse().map(Technique::Widened),
        }
    }
}

impl Serialize for Technique {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Technique {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Final output of a search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultEnvelope {
    /// The query as the caller typed it.
    pub original_query: String,
    /// The query that actually produced `results`.
    pub final_query: String,
    /// Technique that produced `results`.
    pub technique: Technique,
    /// Widening level (0 when no widening happened).
    pub level: usize,
    /// Ranked results, unique by id.
    pub results: Vec<ResultRecord>,
    /// Human-readable summary of what was tried.
    pub explanation: String,
}

impl SearchResultEnvelope {
    /// Build an envelope, deriving the explanation from its other fields.
    pub fn new(
        original_query: impl Into<String>,
        final_query: impl Into<String>,
        technique: Technique,
        level: usize,
        results: Vec<ResultRecord>,
    ) -> Self {
        let original_query = original_query.into();
        let final_query = final_query.into();
        let explanation = explain(&original_query, &final_query, technique, level, results.len());

        Self {
            original_query,
            final_query,
            technique,
            level,
            results,
            explanation,
        }
    }

    /// Envelope for a search that found nothing.
    pub fn exhausted(original_query: &str, final_query: &str, level: usize) -> Self {
        Self::new(original_query, final_query, Technique::Exhausted, level, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn count_of(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Explanation text for an envelope.
///
/// Depends only on its arguments, so the same outcome always reads the same.
pub fn explain(
    original_query: &str,
    final_query: &str,
    technique: Technique,
    level: usize,
    result_count: usize,
) -> String {
    match technique {
        Technique::Exact => format!(
            "Found {} for '{}' using exact match.",
            count_of(result_count, "result", "results"),
            original_query
        ),
        Technique::Hybrid => format!(
            "Found {} for '{}' using hybrid semantic search.",
            count_of(result_count, "result", "results"),
            original_query
        ),
        Technique::Widened(t) => format!(
            "No exact matches for '{}'. Found {} using {} (level {}) with query '{}'.",
            original_query,
            count_of(result_count, "result", "results"),
            t,
            level,
            final_query
        ),
        Technique::Exhausted if original_query.trim().is_empty() => {
            "No results: the query is empty, so no widening was possible.".to_string()
        }
        Technique::Exhausted if level == 0 => format!(
            "No results for '{}'; no widening strategies were attempted.",
            original_query
        ),
        Technique::Exhausted => format!(
            "No results for '{}', even after trying {} (last query: '{}').",
            original_query,
            count_of(level, "widening strategy", "widening strategies"),
            final_query
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technique_serializes_as_name() {
        let json = serde_json::to_value(Technique::Widened(WideningTechnique::SynonymExpansion)).unwrap();
        assert_eq!(json, "synonym expansion");
        assert_eq!(serde_json::to_value(Technique::Exhausted).unwrap(), "exhausted");

        let parsed: Technique = serde_json::from_value(serde_json::json!("stemming")).unwrap();
        assert_eq!(parsed, Technique::Widened(WideningTechnique::Stemming));
        assert!(serde_json::from_value::<Technique>(serde_json::json!("magic")).is_err());
    }

    #[test]
    fn test_explanation_is_derived_from_fields() {
        let a = SearchResultEnvelope::new("q", "q", Technique::Exact, 0, Vec::new());
        let b = SearchResultEnvelope::new("q", "q", Technique::Exact, 0, Vec::new());
        assert_eq!(a.explanation, b.explanation);
        assert_eq!(a.explanation, "Found 0 results for 'q' using exact match.");
    }

    #[test]
    fn test_widened_explanation_mentions_level_and_query() {
        let text = explain(
            "VERL volcano engine",
            "(VERL OR Volcano) volcano engine",
            Technique::Widened(WideningTechnique::SynonymExpansion),
            1,
            3,
        );
        assert_eq!(
            text,
            "No exact matches for 'VERL volcano engine'. Found 3 results using synonym expansion (level 1) with query '(VERL OR Volcano) volcano engine'."
        );
    }

    #[test]
    fn test_exhausted_explanations() {
        assert!(explain("", "", Technique::Exhausted, 0, 0).contains("empty"));
        assert_eq!(
            explain("zq", "zq", Technique::Exhausted, 4, 0),
            "No results for 'zq', even after trying 4 widening strategies (last query: 'zq')."
        );
        assert!(explain("zq", "zq*", Technique::Exhausted, 1, 0).contains("1 widening strategy "));
    }

    #[test]
    fn test_envelope_serializes_expected_fields() {
        let envelope = SearchResultEnvelope::exhausted("q", "q", 0);
        let json = serde_json::to_value(&envelope).unwrap();
        for field in [
            "original_query",
            "final_query",
            "technique",
            "level",
            "results",
            "explanation",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }
}
