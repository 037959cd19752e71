//! Memory record model and the option/result types exchanged with callers.

use crate::error::ValidationError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one day, the unit used by decay and pruning ages.
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Closed set of memory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Decision,
    Lesson,
    Preference,
    Episode,
    Fact,
    Person,
    Project,
}

impl MemoryCategory {
    /// Every category, in declaration order.
    pub const ALL: [MemoryCategory; 7] = [
        MemoryCategory::Decision,
        MemoryCategory::Lesson,
        MemoryCategory::Preference,
        MemoryCategory::Episode,
        MemoryCategory::Fact,
        MemoryCategory::Person,
        MemoryCategory::Project,
    ];

    /// Stable lower-case name, as stored in the `category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Decision => "decision",
            MemoryCategory::Lesson => "lesson",
            MemoryCategory::Preference => "preference",
            MemoryCategory::Episode => "episode",
            MemoryCategory::Fact => "fact",
            MemoryCategory::Person => "person",
            MemoryCategory::Project => "project",
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        MemoryCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidCategory(value.to_string()))
    }
}

/// Persisted memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Record identifier, immutable.
    pub id: String,
    /// Trimmed, non-empty content.
    pub content: String,
    /// Record category.
    pub category: MemoryCategory,
    /// Tags; membership is what matters, not order.
    pub tags: Vec<String>,
    /// Creation time (epoch millis), immutable.
    pub timestamp: i64,
    /// Retention priority in [0, 1].
    pub importance: f64,
    /// Embedding vector for similarity search.
    pub embedding: Vec<f32>,
    /// Last read or search-hit time (epoch millis).
    pub last_accessed: i64,
}

impl MemoryRecord {
    /// True when the record carries every requested tag.
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|tag| self.tags.contains(tag))
    }
}

/// Caller-supplied input for a new memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryInput {
    pub content: String,
    pub category: MemoryCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time override (epoch millis); defaults to now.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Importance override; defaults to 0.5.
    #[serde(default)]
    pub importance: Option<f64>,
}

impl MemoryInput {
    /// Build an input with default tags, timestamp, and importance.
    pub fn new(content: impl Into<String>, category: MemoryCategory) -> Self {
        Self {
            content: content.into(),
            category,
            tags: Vec::new(),
            timestamp: None,
            importance: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Filters for listing records. All fields are optional and conjunctive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub category: Option<MemoryCategory>,
    /// Records must contain every listed tag.
    pub tags: Vec<String>,
    /// Inclusive lower bound on `timestamp`.
    pub since: Option<i64>,
    /// Inclusive upper bound on `timestamp`.
    pub until: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Options for hybrid search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Maximum results; defaults to [`DEFAULT_SEARCH_LIMIT`](crate::search::DEFAULT_SEARCH_LIMIT).
    pub limit: Option<usize>,
    pub category: Option<MemoryCategory>,
    pub tags: Vec<String>,
    /// Keyword text for token overlap scoring; defaults to the query.
    pub keyword: Option<String>,
}

/// A scored search hit. Scores are never persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub record: MemoryRecord,
    pub score: f64,
}

/// Operational snapshot returned by `health`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub ok: bool,
    pub memory_count: usize,
    pub db_path: String,
    pub wal_path: String,
}

/// Outcome of a summarization pass.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SummarizeReport {
    pub summaries: usize,
    pub deleted: usize,
}

/// Outcome of a decay pass.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DecayReport {
    pub updated: usize,
    pub pruned: usize,
}

#[cfg(test)]
mod tests {
    use super::{MemoryCategory, MemoryRecord};
    use crate::error::ValidationError;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_parses_every_member() {
        for category in MemoryCategory::ALL {
            let parsed: MemoryCategory = category.as_str().parse().expect("parse");
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn category_rejects_unknown_names() {
        let err = "opinion".parse::<MemoryCategory>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidCategory("opinion".to_string()));
    }

    #[test]
    fn record_serializes_with_camel_case_fields() {
        let record = MemoryRecord {
            id: "m-1".to_string(),
            content: "hello".to_string(),
            category: MemoryCategory::Fact,
            tags: vec!["a".to_string()],
            timestamp: 1,
            importance: 0.5,
            embedding: vec![0.5],
            last_accessed: 2,
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["lastAccessed"], serde_json::json!(2));
        assert_eq!(value["category"], serde_json::json!("fact"));
    }

    #[test]
    fn tag_superset_matching_ignores_order() {
        let record = MemoryRecord {
            id: "m-1".to_string(),
            content: "hello".to_string(),
            category: MemoryCategory::Fact,
            tags: vec!["b".to_string(), "a".to_string(), "c".to_string()],
            timestamp: 1,
            importance: 0.5,
            embedding: Vec::new(),
            last_accessed: 1,
        };
        assert!(record.has_all_tags(&["a".to_string(), "b".to_string()]));
        assert!(!record.has_all_tags(&["a".to_string(), "z".to_string()]));
        assert!(record.has_all_tags(&[]));
    }
}
