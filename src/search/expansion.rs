//! Query rewriting strategies for progressive widening.
//!
//! Every strategy rewrites the original query; strategies never chain onto
//! each other's output.

use crate::config::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Explicit disjunction separator understood by the keyword retrievers.
pub(crate) const OR_SEPARATOR: &str = " OR ";

/// Suffixes stripped by the stemming strategy, tried in order.
const STEM_SUFFIXES: &[&str] = &["ing", "ed", "s", "er", "est", "ly"];

/// Tokens at or below this length get no fuzzy wildcard.
const FUZZY_MIN_CHARS: usize = 3;

/// The widening ladder, in the order it is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WideningTechnique {
    #[serde(rename = "synonym expansion")]
    SynonymExpansion,
    #[serde(rename = "stemming")]
    Stemming,
    #[serde(rename = "fuzzy matching")]
    FuzzyMatching,
    #[serde(rename = "semantic expansion")]
    SemanticExpansion,
}

impl WideningTechnique {
    /// All techniques, least permissive first.
    pub const LADDER: [WideningTechnique; 4] = [
        WideningTechnique::SynonymExpansion,
        WideningTechnique::Stemming,
        WideningTechnique::FuzzyMatching,
        WideningTechnique::SemanticExpansion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WideningTechnique::SynonymExpansion => "synonym expansion",
            WideningTechnique::Stemming => "stemming",
            WideningTechnique::FuzzyMatching => "fuzzy matching",
            WideningTechnique::SemanticExpansion => "semantic expansion",
        }
    }

    /// 1-based position in the ladder.
    pub fn level(&self) -> usize {
        match self {
            WideningTechnique::SynonymExpansion => 1,
            WideningTechnique::Stemming => 2,
            WideningTechnique::FuzzyMatching => 3,
            WideningTechnique::SemanticExpansion => 4,
        }
    }

    /// Rewrite `query` with this technique.
    pub fn rewrite(&self, query: &str, vocabulary: &Vocabulary) -> String {
        match self {
            WideningTechnique::SynonymExpansion => expand_synonyms(query, vocabulary),
            WideningTechnique::Stemming => expand_stems(query),
            WideningTechnique::FuzzyMatching => fuzzy(query),
            WideningTechnique::SemanticExpansion => expand_concepts(query, vocabulary),
        }
    }
}

impl fmt::Display for WideningTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for WideningTechnique {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WideningTechnique::LADDER
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown widening technique: {}", s))
    }
}

/// Split a query on whitespace.
pub fn tokenize(query: &str) -> Vec<&str> {
    query.split_whitespace().collect()
}

/// Collects tokens, dropping case-insensitive repeats and keeping first-seen order.
#[derive(Default)]
struct TokenSet {
    seen: HashSet<String>,
    tokens: Vec<String>,
}

impl TokenSet {
    fn push(&mut self, token: &str) {
        if self.seen.insert(token.to_lowercase()) {
            self.tokens.push(token.to_string());
        }
    }

    fn join(self, separator: &str) -> String {
        self.tokens.join(separator)
    }

    /// Render as one any-of position: a bare token, or `(a OR b ...)`.
    fn group(self) -> String {
        if let [single] = self.tokens.as_slice() {
            return single.clone();
        }
        let members: Vec<String> = self
            .tokens
            .iter()
            .map(|t| t.replace(['(', ')'], " ").trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        format!("({})", members.join(OR_SEPARATOR))
    }
}

/// Rewrite each token as a group of itself plus `additions(token)`.
///
/// Every group keeps its original token, so the rewrite matches whatever the
/// original query matched.
fn expand_in_groups<'a, I>(query: &'a str, additions: impl Fn(&'a str) -> I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups = TokenSet::default();
    for token in tokenize(query) {
        let mut members = TokenSet::default();
        members.push(token);
        for addition in additions(token) {
            members.push(addition);
        }
        groups.push(&members.group());
    }
    groups.join(" ")
}

/// Group each token with its known acronym/jargon expansions.
fn expand_synonyms(query: &str, vocabulary: &Vocabulary) -> String {
    expand_in_groups(query, |token| {
        vocabulary.synonyms(token).iter().map(String::as_str)
    })
}

/// Stem of `token` for the first matching suffix, if the token is long enough.
fn stem(token: &str) -> Option<&str> {
    let char_count = token.chars().count();
    // ASCII lowercasing keeps byte offsets, so the slice below stays on a char boundary.
    let lower = token.to_ascii_lowercase();

    STEM_SUFFIXES
        .iter()
        .find(|suffix| char_count > suffix.len() + 2 && lower.ends_with(*suffix))
        .map(|suffix| &token[..token.len() - suffix.len()])
}

/// Group each token with its stemmed form.
fn expand_stems(query: &str) -> String {
    expand_in_groups(query, stem)
}

/// Add a trailing wildcard to longer tokens and OR everything together.
fn fuzzy(query: &str) -> String {
    tokenize(query)
        .into_iter()
        .map(|token| {
            if token.chars().count() > FUZZY_MIN_CHARS {
                format!("{}*", token)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(OR_SEPARATOR)
}

/// Union each token with its associated concepts and OR everything together.
fn expand_concepts(query: &str, vocabulary: &Vocabulary) -> String {
    let mut set = TokenSet::default();
    for token in tokenize(query) {
        set.push(token);
        for term in vocabulary.concepts(token) {
            set.push(term);
        }
    }
    set.join(OR_SEPARATOR)
}
