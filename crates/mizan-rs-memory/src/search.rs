//! Hybrid keyword and semantic ranking.

use crate::embedding::cosine_similarity;
use crate::model::{MemoryRecord, SearchOptions, SearchResult};

/// Results returned when no limit is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
const SEMANTIC_WEIGHT: f64 = 0.8;
const KEYWORD_WEIGHT: f64 = 0.2;

/// Fraction of lower-cased whitespace tokens of `keyword` found in the
/// record's content and tags.
pub fn keyword_score(record: &MemoryRecord, keyword: &str) -> f64 {
    let tokens: Vec<String> = keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let haystack = format!("{} {}", record.content, record.tags.join(" ")).to_lowercase();
    let hits = tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count();
    hits as f64 / tokens.len() as f64
}

/// Score and order `candidates` against a query embedding.
///
/// Candidates failing the category or tag filter are dropped. Ties keep
/// candidate order.
pub fn rank(
    candidates: Vec<MemoryRecord>,
    query_embedding: &[f32],
    query: &str,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    let keyword = options.keyword.as_deref().unwrap_or(query);
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|record| {
            options
                .category
                .is_none_or(|category| record.category == category)
                && record.has_all_tags(&options.tags)
        })
        .map(|record| {
            let semantic = cosine_similarity(query_embedding, &record.embedding);
            let lexical = keyword_score(&record, keyword);
            SearchResult {
                score: SEMANTIC_WEIGHT * semantic + KEYWORD_WEIGHT * lexical,
                record,
            }
        })
        .collect();
    // sort_by is stable
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(options.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
    results
}
