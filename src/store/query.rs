//! Parsing of retriever query strings into safe match expressions.
//!
//! Query strings are whitespace-separated terms. A bare `OR` separates
//! alternatives, adjacent terms must all match, and a trailing `*` marks a
//! prefix term. A parenthesised group such as `(train OR trained)` fills one
//! position of a clause and matches when any of its terms does. Every other
//! piece of punctuation is stripped, so the rendered FTS5 expression can never
//! be a syntax error.

/// A single search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Sanitised, lowercased term text.
    pub text: String,
    /// Match as a prefix instead of a whole word.
    pub prefix: bool,
}

impl Term {
    fn parse(token: &str) -> Option<Self> {
        let term = Term {
            text: sanitize(token),
            prefix: token.ends_with('*'),
        };
        let searchable = term.words().next().is_some();
        searchable.then_some(term)
    }

    /// Words of the term as the FTS tokenizer would see them.
    fn words(&self) -> impl Iterator<Item = &str> {
        self.text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
    }

    fn to_fts5(&self) -> String {
        if self.prefix {
            format!("\"{}\"*", self.text)
        } else {
            format!("\"{}\"", self.text)
        }
    }

    /// Occurrences of the term in `words`, or None when one of its words is missing.
    fn hits(&self, words: &[String]) -> Option<usize> {
        let term_words: Vec<&str> = self.words().collect();
        let last = term_words.len().saturating_sub(1);
        let mut total = 0;
        for (i, tw) in term_words.iter().enumerate() {
            let hits = words
                .iter()
                .filter(|w| {
                    if self.prefix && i == last {
                        w.starts_with(tw)
                    } else {
                        w.as_str() == *tw
                    }
                })
                .count();
            if hits == 0 {
                return None;
            }
            total += hits;
        }
        Some(total)
    }
}

/// One position of a clause: satisfied when any of its terms matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyOf(pub Vec<Term>);

impl AnyOf {
    fn to_fts5(&self) -> String {
        match self.0.as_slice() {
            [single] => single.to_fts5(),
            terms => format!(
                "({})",
                terms.iter().map(Term::to_fts5).collect::<Vec<_>>().join(" OR ")
            ),
        }
    }

    fn hits(&self, words: &[String]) -> Option<usize> {
        self.0
            .iter()
            .filter_map(|term| term.hits(words))
            .reduce(|a, b| a + b)
    }
}

/// A disjunction of conjunctions of term groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchExpr {
    clauses: Vec<Vec<AnyOf>>,
}

fn sanitize(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '\''))
        .collect::<String>()
        .to_lowercase()
}

/// Whitespace tokens with parentheses split out as tokens of their own.
fn lex(query: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for chunk in query.split_whitespace() {
        let mut start = 0;
        for (i, c) in chunk.char_indices() {
            if matches!(c, '(' | ')') {
                if start < i {
                    tokens.push(&chunk[start..i]);
                }
                tokens.push(&chunk[i..i + 1]);
                start = i + 1;
            }
        }
        if start < chunk.len() {
            tokens.push(&chunk[start..]);
        }
    }
    tokens
}

impl MatchExpr {
    /// Parse a query string. Never fails; unusable input gives an empty expression.
    ///
    /// Groups do not nest: an inner `(` is ignored, the first `)` closes the
    /// group, a stray `)` is dropped and an unclosed group ends with the query.
    pub fn parse(query: &str) -> Self {
        let mut clauses: Vec<Vec<AnyOf>> = Vec::new();
        let mut current: Vec<AnyOf> = Vec::new();
        let mut group: Option<Vec<Term>> = None;

        for token in lex(query) {
            match (token, group.is_some()) {
                ("(", false) => group = Some(Vec::new()),
                ("(", true) | ("OR", true) | (")", false) => {}
                (")", true) => {
                    if let Some(terms) = group.take().filter(|t| !t.is_empty()) {
                        current.push(AnyOf(terms));
                    }
                }
                ("OR", false) => {
                    if !current.is_empty() {
                        clauses.push(std::mem::take(&mut current));
                    }
                }
                (token, true) => {
                    if let (Some(terms), Some(term)) = (group.as_mut(), Term::parse(token)) {
                        terms.push(term);
                    }
                }
                (token, false) => current.extend(Term::parse(token).map(|t| AnyOf(vec![t]))),
            }
        }

        if let Some(terms) = group.filter(|t| !t.is_empty()) {
            current.push(AnyOf(terms));
        }
        if !current.is_empty() {
            clauses.push(current);
        }

        Self { clauses }
    }

    /// True when nothing searchable is left.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Vec<AnyOf>] {
        &self.clauses
    }

    /// Render as an SQLite FTS5 MATCH expression. None when empty.
    pub fn to_fts5(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let rendered: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                clause
                    .iter()
                    .map(AnyOf::to_fts5)
                    .collect::<Vec<_>>()
                    .join(" AND ")
            })
            .collect();

        if rendered.len() == 1 {
            rendered.into_iter().next()
        } else {
            Some(
                rendered
                    .iter()
                    .map(|c| format!("({})", c))
                    .collect::<Vec<_>>()
                    .join(" OR "),
            )
        }
    }

    /// Score a document given its lowercased words, or None if it does not match.
    ///
    /// A clause matches when every group has a term whose words appear in the
    /// document; the score counts the occurrences of matched words across
    /// matching clauses.
    pub fn score_words(&self, words: &[String]) -> Option<f32> {
        let mut score = 0usize;
        let mut matched = false;

        for clause in &self.clauses {
            let clause_score = clause
                .iter()
                .map(|group| group.hits(words))
                .try_fold(0usize, |acc, hits| hits.map(|h| acc + h));

            if let Some(clause_score) = clause_score {
                matched = true;
                score += clause_score;
            }
        }

        matched.then_some(score as f32)
    }
}

/// Lowercased words of a text, split on anything that is not alphanumeric.
pub(crate) fn words_of(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_terms_form_one_clause() {
        let expr = MatchExpr::parse("reinforcement learning PPO");
        assert_eq!(expr.clauses().len(), 1);
        assert_eq!(
            expr.to_fts5().unwrap(),
            "\"reinforcement\" AND \"learning\" AND \"ppo\""
        );
    }

    #[test]
    fn test_or_and_prefix() {
        let expr = MatchExpr::parse("rust* OR async* OR io");
        assert_eq!(expr.to_fts5().unwrap(), "(\"rust\"*) OR (\"async\"*) OR (\"io\")");
    }

    #[test]
    fn test_group_is_one_any_of_position() {
        let expr = MatchExpr::parse("(VERL OR Volcano OR Engine) volcano engine");
        assert_eq!(expr.clauses().len(), 1);
        assert_eq!(
            expr.to_fts5().unwrap(),
            "(\"verl\" OR \"volcano\" OR \"engine\") AND \"volcano\" AND \"engine\""
        );
    }

    #[test]
    fn test_group_without_inner_or_and_with_prefix() {
        let expr = MatchExpr::parse("(trained train) models*");
        assert_eq!(
            expr.to_fts5().unwrap(),
            "(\"trained\" OR \"train\") AND \"models\"*"
        );
    }

    #[test]
    fn test_special_characters_are_stripped() {
        let expr = MatchExpr::parse("\"title: (draft)\" NEAR/3 ^x");
        assert_eq!(
            expr.to_fts5().unwrap(),
            "\"title\" AND \"draft\" AND \"near3\" AND \"x\""
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert_eq!(
            MatchExpr::parse("policy (gradient OR (ppo").to_fts5().unwrap(),
            "\"policy\" AND (\"gradient\" OR \"ppo\")"
        );
        assert_eq!(MatchExpr::parse(") rust ( )").to_fts5().unwrap(), "\"rust\"");
        assert!(MatchExpr::parse("( ::: )").is_empty());
    }

    #[test]
    fn test_dangling_or_is_dropped() {
        let expr = MatchExpr::parse("OR rust OR OR ::: OR");
        assert_eq!(expr.to_fts5().unwrap(), "\"rust\"");
    }

    #[test]
    fn test_empty_expression() {
        assert!(MatchExpr::parse("").is_empty());
        assert!(MatchExpr::parse("*** ???").to_fts5().is_none());
    }

    #[test]
    fn test_score_words() {
        let words = words_of("Proximal Policy Optimization explained: policy gradients");

        assert_eq!(MatchExpr::parse("policy").score_words(&words), Some(2.0));
        assert_eq!(MatchExpr::parse("policy missing").score_words(&words), None);
        assert_eq!(MatchExpr::parse("missing OR grad*").score_words(&words), Some(1.0));
        assert_eq!(MatchExpr::parse("fine-tuning").score_words(&words), None);
    }

    #[test]
    fn test_score_words_with_groups() {
        let words = words_of("How to train models");

        assert_eq!(MatchExpr::parse("trained models").score_words(&words), None);
        assert_eq!(
            MatchExpr::parse("(trained OR train) (models OR model)").score_words(&words),
            Some(2.0)
        );
        assert_eq!(MatchExpr::parse("(trained OR missing) models").score_words(&words), None);
    }

    #[test]
    fn test_hyphenated_terms_match_word_sequence() {
        let words = words_of("A guide to fine-tuning models");
        assert!(MatchExpr::parse("fine-tuning").score_words(&words).is_some());
    }
}
