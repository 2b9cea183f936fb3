//! Syntactic routing heuristic: does a query read like a conceptual question?

/// Connector words typical of conceptual questions.
const CONNECTOR_WORDS: &[&str] = &[
    "understanding",
    "about",
    "how",
    "why",
    "what",
    "explaining",
    "explain",
    "explained",
];

/// Abstract nouns that signal a conceptual rather than literal query.
const ABSTRACT_MARKERS: &[&str] = &[
    "architecture",
    "concept",
    "concepts",
    "theory",
    "approach",
    "method",
    "methods",
    "methodology",
    "framework",
    "principle",
    "paradigm",
];

const CONJUNCTIONS: &[&str] = &["and", "or"];

/// Minimum token count that counts as a long query.
const LONG_QUERY_TOKENS: usize = 3;

/// Signals that must hold for a query to count as semantic.
const REQUIRED_SIGNALS: usize = 2;

/// Classify a query as semantic when at least two signals hold: it is long,
/// it has a connector word, it has an abstract-noun marker, or it has a
/// standalone conjunction.
pub fn is_semantic_query(query: &str) -> bool {
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .collect();

    let has_any = |set: &[&str]| words.iter().any(|w| set.contains(&w.as_str()));

    let signals = [
        words.len() >= LONG_QUERY_TOKENS,
        has_any(CONNECTOR_WORDS),
        has_any(ABSTRACT_MARKERS),
        has_any(CONJUNCTIONS),
    ];

    signals.iter().filter(|s| **s).count() >= REQUIRED_SIGNALS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_query_with_connector_is_semantic() {
        assert!(is_semantic_query("understanding PPO clipping objective"));
        assert!(is_semantic_query("How does attention work?"));
    }

    #[test]
    fn test_short_keyword_queries_are_not_semantic() {
        assert!(!is_semantic_query("PPO"));
        assert!(!is_semantic_query("reinforcement learning PPO"));
        assert!(!is_semantic_query("why"));
    }

    #[test]
    fn test_two_short_signals_suffice() {
        assert!(is_semantic_query("what architecture"));
        assert!(is_semantic_query("theory or practice"));
        assert!(!is_semantic_query("transformer architecture"));
    }

    #[test]
    fn test_conjunction_must_be_standalone() {
        assert!(is_semantic_query("Theory AND practice"));
        assert!(!is_semantic_query("android orchestra"));
    }

    #[test]
    fn test_conjunction_counts_as_a_signal() {
        // One other signal plus the conjunction, with fewer than three tokens.
        assert!(!is_semantic_query("theory"));
        assert!(is_semantic_query("theory or"));
        assert!(!is_semantic_query("what"));
        assert!(is_semantic_query("what AND"));
        assert!(!is_semantic_query("theory android"));
    }

    #[test]
    fn test_empty_query() {
        assert!(!is_semantic_query(""));
    }
}
