//! Compaction planning: fold low-importance records into per-category summaries.

use crate::model::{MemoryCategory, MemoryInput, MemoryRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

/// Snippets longer than this are truncated.
const SNIPPET_MAX_CHARS: usize = 140;
/// Marker appended to truncated snippets.
const ELLIPSIS: &str = "...";
/// Tag carried by every summary record.
pub const SUMMARY_TAG: &str = "summary";

/// Policy for compacting low-value records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactionPolicy {
    /// Minimum record count before a summarize pass does anything.
    pub threshold: usize,
    /// Maximum sources folded into one summary.
    pub max_group_size: usize,
    /// Records at or above this importance are never compacted.
    pub preserve_importance: f64,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            threshold: 200,
            max_group_size: 12,
            preserve_importance: 0.7,
        }
    }
}

/// One proposed summary plus the records it replaces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionPlan {
    pub summary: MemoryInput,
    pub source_ids: Vec<String>,
}

/// Plan compaction over `records`.
///
/// Records with importance at or above `preserve_importance` are skipped. The
/// rest are grouped by category; each group of two or more yields one plan
/// covering its oldest `max_group_size` members. Plans come out in category
/// declaration order.
pub fn plan_compaction(
    records: &[MemoryRecord],
    max_group_size: usize,
    preserve_importance: f64,
    now: i64,
) -> Vec<CompactionPlan> {
    let mut grouped: BTreeMap<MemoryCategory, Vec<&MemoryRecord>> = BTreeMap::new();
    for record in records {
        if record.importance >= preserve_importance {
            continue;
        }
        grouped.entry(record.category).or_default().push(record);
    }

    let mut plans = Vec::new();
    for (category, mut group) in grouped {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|record| record.timestamp);
        group.truncate(max_group_size);
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let content = format!(
            "Summary ({category}) {} - {}: {}",
            iso_timestamp(first.timestamp),
            iso_timestamp(last.timestamp),
            summarize_text(&group)
        );
        plans.push(CompactionPlan {
            summary: MemoryInput {
                content,
                category,
                tags: vec![SUMMARY_TAG.to_string()],
                timestamp: Some(now),
                importance: Some(preserve_importance),
            },
            source_ids: group.iter().map(|record| record.id.clone()).collect(),
        });
    }
    plans
}

/// Join truncated snippets of each record with single spaces.
fn summarize_text(records: &[&MemoryRecord]) -> String {
    records
        .iter()
        .map(|record| snippet(record.content.trim()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn snippet(content: &str) -> String {
    if content.chars().count() <= SNIPPET_MAX_CHARS {
        return content.to_string();
    }
    let keep = SNIPPET_MAX_CHARS - ELLIPSIS.len();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn iso_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::{SUMMARY_TAG, plan_compaction, snippet};
    use crate::model::{MemoryCategory, MemoryRecord};
    use pretty_assertions::assert_eq;

    fn record(id: &str, category: MemoryCategory, importance: f64, timestamp: i64) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            content: format!("note {id}"),
            category,
            tags: Vec::new(),
            timestamp,
            importance,
            embedding: Vec::new(),
            last_accessed: timestamp,
        }
    }

    #[test]
    fn groups_low_importance_records_and_preserves_high_ones() {
        let records = vec![
            record("low-a", MemoryCategory::Fact, 0.3, 2_000),
            record("high", MemoryCategory::Fact, 0.9, 1_000),
            record("low-b", MemoryCategory::Fact, 0.2, 1_500),
        ];
        let plans = plan_compaction(&records, 12, 0.7, 9_000);

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.source_ids, vec!["low-b".to_string(), "low-a".to_string()]);
        assert_eq!(plan.summary.category, MemoryCategory::Fact);
        assert_eq!(plan.summary.importance, Some(0.7));
        assert_eq!(plan.summary.tags, vec![SUMMARY_TAG.to_string()]);
        assert_eq!(plan.summary.timestamp, Some(9_000));
        assert!(plan.summary.content.starts_with("Summary (fact) 1970-01-01T00:00:01.500Z - "));
        assert!(plan.summary.content.ends_with(": note low-b note low-a"));
    }

    #[test]
    fn singleton_groups_produce_no_plan() {
        let records = vec![
            record("a", MemoryCategory::Fact, 0.1, 1),
            record("b", MemoryCategory::Person, 0.1, 2),
            record("c", MemoryCategory::Person, 0.75, 3),
        ];
        assert!(plan_compaction(&records, 12, 0.7, 10).is_empty());
    }

    #[test]
    fn caps_group_at_oldest_members_and_orders_by_category() {
        let mut records: Vec<MemoryRecord> = (0..5)
            .map(|i| record(&format!("ep-{i}"), MemoryCategory::Episode, 0.1, 100 - i))
            .collect();
        records.push(record("dec-1", MemoryCategory::Decision, 0.1, 5));
        records.push(record("dec-2", MemoryCategory::Decision, 0.1, 6));

        let plans = plan_compaction(&records, 3, 0.7, 1_000);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].summary.category, MemoryCategory::Decision);
        assert_eq!(plans[1].summary.category, MemoryCategory::Episode);
        assert_eq!(
            plans[1].source_ids,
            vec!["ep-4".to_string(), "ep-3".to_string(), "ep-2".to_string()]
        );
    }

    #[test]
    fn snippet_truncates_long_content_with_marker() {
        let long = "x".repeat(200);
        let short = snippet(&long);
        assert_eq!(short.chars().count(), 140);
        assert!(short.ends_with("..."));
        assert_eq!(snippet("short"), "short");
        assert_eq!(snippet(&"y".repeat(140)), "y".repeat(140));
    }
}
