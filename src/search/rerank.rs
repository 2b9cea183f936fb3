//! Merging, deduplication and context re-ranking of result rows.

use super::ResultRecord;
use std::collections::HashSet;

/// Drop rows whose id was already seen, keeping the first occurrence.
pub fn deduplicate(rows: Vec<ResultRecord>) -> Vec<ResultRecord> {
    let mut seen: HashSet<String> = HashSet::new();

    rows.into_iter()
        .filter(|row| seen.insert(row.id.clone()))
        .collect()
}

/// Scale a source's scores so its best row scores 1.0.
///
/// Sources with no positive score are left as they are.
fn normalize_scores(mut rows: Vec<ResultRecord>) -> Vec<ResultRecord> {
    let best = rows.iter().map(|r| r.score).fold(f32::NEG_INFINITY, f32::max);
    if best > 0.0 {
        for row in rows.iter_mut() {
            row.score /= best;
        }
    }
    rows
}

/// Concatenate result lists in priority order and deduplicate by id.
///
/// Earlier sources win: a row present in two sources keeps the copy from the
/// first one. Each source is normalised first, so keyword and similarity
/// scores share one scale before a context boost is applied.
pub fn merge_results(sources: Vec<Vec<ResultRecord>>) -> Vec<ResultRecord> {
    deduplicate(sources.into_iter().flat_map(normalize_scores).collect())
}

/// Words of a title, lowercased and stripped of surrounding punctuation.
fn title_words(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

fn matches_context(row: &ResultRecord, entities: &HashSet<String>) -> bool {
    entities.contains(&row.channel.to_lowercase())
        || title_words(&row.title).any(|w| entities.contains(&w))
}

/// Boost rows that mention a context entity and re-sort.
///
/// `entities` must be lowercased. A row whose channel or any title word
/// matches gets `boost` added to its score once. The sort is stable and
/// descending, so rows with equal scores keep their prior order.
pub fn rerank_with_context(
    mut rows: Vec<ResultRecord>,
    entities: &HashSet<String>,
    boost: f32,
) -> Vec<ResultRecord> {
    if entities.is_empty() {
        return rows;
    }

    for row in rows.iter_mut() {
        if matches_context(row, entities) {
            row.score += boost;
        }
    }

    rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    rows
}
