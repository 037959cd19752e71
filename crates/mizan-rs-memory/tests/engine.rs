use mizan_rs_memory::model::{MILLIS_PER_DAY, now_millis};
use mizan_rs_memory::{
    DurabilityLog, EngineOptions, ListOptions, MemoryCategory, MemoryEngine, MemoryError,
    MemoryInput, SearchOptions, ValidationError, plan_compaction,
};
use mizan_rs_test_utils::{
    CountingEmbedder, EmptyEmbedder, GrowingEmbedder, StubEmbedder, UnavailableEmbedder,
    record_fixture,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

fn options(temp: &TempDir) -> EngineOptions {
    EngineOptions::new(temp.path().join("memory.db"), temp.path().join("memory.wal"))
}

fn open(temp: &TempDir) -> MemoryEngine {
    MemoryEngine::open(options(temp), Arc::new(StubEmbedder::new())).expect("open engine")
}

fn log_len(temp: &TempDir) -> usize {
    DurabilityLog::open(temp.path().join("memory.wal"))
        .expect("log")
        .read_all()
        .expect("read log")
        .len()
}

#[tokio::test]
async fn add_get_delete_round_trip() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);

    let record = engine
        .add_memory(
            MemoryInput::new(
                "  Abdullah prefers Arabic communication  ",
                MemoryCategory::Preference,
            )
            .with_tags(["language", "communication"])
            .with_importance(0.8),
        )
        .await
        .expect("add");
    assert_eq!(record.content, "Abdullah prefers Arabic communication");
    assert_eq!(record.last_accessed, record.timestamp);
    assert!(!record.embedding.is_empty());

    let listed = engine
        .list(&ListOptions {
            category: Some(MemoryCategory::Preference),
            ..ListOptions::default()
        })
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].importance, 0.8);
    assert_eq!(engine.health().expect("health").memory_count, 1);

    let fetched = engine.get(&record.id).expect("get").expect("present");
    assert!((fetched.importance - 0.82).abs() < 1e-9);
    assert!(fetched.last_accessed >= record.timestamp);
    let stored = engine.list(&ListOptions::default()).expect("list");
    assert_eq!(stored[0].importance, fetched.importance);

    assert!(engine.delete(&record.id).expect("delete"));
    assert!(!engine.delete(&record.id).expect("delete again"));
    assert!(engine.get(&record.id).expect("get").is_none());
    assert_eq!(engine.health().expect("health").memory_count, 0);
    engine.close().expect("close");
}

#[tokio::test]
async fn get_boost_is_capped_at_one() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);
    let record = engine
        .add_memory(MemoryInput::new("nearly certain", MemoryCategory::Fact).with_importance(0.99))
        .await
        .expect("add");

    let fetched = engine.get(&record.id).expect("get").expect("present");
    assert_eq!(fetched.importance, 1.0);
    let fetched = engine.get(&record.id).expect("get").expect("present");
    assert_eq!(fetched.importance, 1.0);
}

#[tokio::test]
async fn validation_failures_leave_no_trace() {
    let temp = tempdir().expect("tempdir");
    let embedder = CountingEmbedder::new();
    let mut engine =
        MemoryEngine::open(options(&temp), Arc::new(embedder.clone())).expect("open engine");

    let err = engine
        .add_memory(MemoryInput::new("   ", MemoryCategory::Fact))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::Validation(ValidationError::EmptyContent)
    ));

    let err = engine
        .add_memory(MemoryInput::new("too important", MemoryCategory::Fact).with_importance(1.5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::Validation(ValidationError::InvalidImportance(_))
    ));

    let err = engine
        .search("  ", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(ValidationError::EmptyQuery)));

    let err = engine.delete("").unwrap_err();
    assert!(err.is_validation());

    assert_eq!(embedder.call_count(), 0);
    assert_eq!(log_len(&temp), 0);
    assert_eq!(engine.health().expect("health").memory_count, 0);
}

#[tokio::test]
async fn embedding_failures_abort_without_state_change() {
    let temp = tempdir().expect("tempdir");
    let mut engine =
        MemoryEngine::open(options(&temp), Arc::new(UnavailableEmbedder)).expect("open engine");
    let err = engine
        .add_memory(MemoryInput::new("needs a vector", MemoryCategory::Fact))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
    assert_eq!(log_len(&temp), 0);
    engine.close().expect("close");

    let mut engine =
        MemoryEngine::open(options(&temp), Arc::new(EmptyEmbedder)).expect("open engine");
    let err = engine
        .add_memory(MemoryInput::new("needs a vector", MemoryCategory::Fact))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    assert_eq!(log_len(&temp), 0);
    assert_eq!(engine.health().expect("health").memory_count, 0);
}

#[tokio::test]
async fn configured_dimensions_reject_other_lengths() {
    let temp = tempdir().expect("tempdir");
    let mut options = options(&temp);
    options.embedding_dimensions = Some(8);
    let mut engine = MemoryEngine::open(options, Arc::new(StubEmbedder::new())).expect("open");

    let err = engine
        .add_memory(MemoryInput::new("wrong size", MemoryCategory::Fact))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    assert_eq!(engine.health().expect("health").memory_count, 0);
}

#[tokio::test]
async fn first_stored_embedding_fixes_the_dimensions() {
    let temp = tempdir().expect("tempdir");
    let mut engine =
        MemoryEngine::open(options(&temp), Arc::new(GrowingEmbedder::starting_at(2)))
            .expect("open");

    let first = engine
        .add_memory(MemoryInput::new("two wide", MemoryCategory::Fact))
        .await
        .expect("add");
    assert_eq!(first.embedding.len(), 2);

    let err = engine
        .add_memory(MemoryInput::new("three wide", MemoryCategory::Fact))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    assert_eq!(engine.health().expect("health").memory_count, 1);
    assert_eq!(log_len(&temp), 1);

    let err = engine
        .search("four wide", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    engine.close().expect("close");

    let mut reopened = open(&temp);
    let err = reopened
        .add_memory(MemoryInput::new("stub vectors are wider", MemoryCategory::Fact))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    assert_eq!(reopened.health().expect("health").memory_count, 1);
}

#[tokio::test]
async fn search_on_empty_store_skips_embedding() {
    let temp = tempdir().expect("tempdir");
    let embedder = CountingEmbedder::new();
    let mut engine =
        MemoryEngine::open(options(&temp), Arc::new(embedder.clone())).expect("open engine");

    let results = engine
        .search("anything", &SearchOptions::default())
        .await
        .expect("search");
    assert!(results.is_empty());
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn search_ranks_relevant_record_first_and_boosts_hits() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);
    let relevant = engine
        .add_memory(
            MemoryInput::new("Abdullah prefers Arabic communication", MemoryCategory::Preference)
                .with_tags(["language"]),
        )
        .await
        .expect("add");
    engine
        .add_memory(MemoryInput::new(
            "the deploy pipeline runs on docker",
            MemoryCategory::Project,
        ))
        .await
        .expect("add");

    let results = engine
        .search("Arabic communication", &SearchOptions::default())
        .await
        .expect("search");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record.id, relevant.id);
    assert!(results[0].score > results[1].score);
    assert!((results[0].record.importance - 0.53).abs() < 1e-9);

    let listed = engine.list(&ListOptions::default()).expect("list");
    for record in listed {
        assert!((record.importance - 0.53).abs() < 1e-9);
        assert!(record.last_accessed >= record.timestamp);
    }

    let filtered = engine
        .search(
            "Arabic communication",
            &SearchOptions {
                category: Some(MemoryCategory::Project),
                ..SearchOptions::default()
            },
        )
        .await
        .expect("search");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].record.category, MemoryCategory::Project);
}

#[tokio::test]
async fn log_flushes_automatically_at_threshold() {
    let temp = tempdir().expect("tempdir");
    let mut options = options(&temp);
    options.flush_threshold = 3;
    let mut engine = MemoryEngine::open(options, Arc::new(StubEmbedder::new())).expect("open");

    let first = engine
        .add_memory(MemoryInput::new("first", MemoryCategory::Episode))
        .await
        .expect("add");
    engine
        .add_memory(MemoryInput::new("second", MemoryCategory::Episode))
        .await
        .expect("add");
    assert_eq!(log_len(&temp), 2);

    engine.delete(&first.id).expect("delete");
    assert_eq!(log_len(&temp), 0);

    engine
        .add_memory(MemoryInput::new("third", MemoryCategory::Episode))
        .await
        .expect("add");
    assert_eq!(log_len(&temp), 1);
    engine.flush_wal().expect("flush");
    assert_eq!(log_len(&temp), 0);
}

#[test]
fn startup_replays_log_idempotently() {
    let temp = tempdir().expect("tempdir");
    let log = DurabilityLog::open(temp.path().join("memory.wal")).expect("log");
    let original = record_fixture("x", "first draft", MemoryCategory::Fact, 0.4, 1_000);
    let mut revised = original.clone();
    revised.content = "final draft".to_string();
    let doomed = record_fixture("y", "short lived", MemoryCategory::Fact, 0.4, 2_000);
    log.append_add(&original).expect("append");
    log.append_add(&revised).expect("append");
    log.append_add(&doomed).expect("append");
    log.append_delete("y").expect("append");

    let mut engine = open(&temp);
    let records = engine.export().expect("export");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "x");
    assert_eq!(records[0].content, "final draft");
    assert_eq!(log_len(&temp), 0);

    assert!(engine.get("y").expect("get").is_none());
    engine.close().expect("close");

    let engine = open(&temp);
    assert_eq!(engine.health().expect("health").memory_count, 1);
}

#[test]
fn malformed_log_fails_startup() {
    let temp = tempdir().expect("tempdir");
    std::fs::write(temp.path().join("memory.wal"), "{not json}\n").expect("write");
    let err = MemoryEngine::open(options(&temp), Arc::new(StubEmbedder::new())).unwrap_err();
    assert!(matches!(err, MemoryError::MalformedLogEntry { line: 1, .. }));
}

#[tokio::test]
async fn summarize_is_a_no_op_below_threshold() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);
    for content in ["one small note", "another small note"] {
        engine
            .add_memory(MemoryInput::new(content, MemoryCategory::Fact).with_importance(0.1))
            .await
            .expect("add");
    }
    let report = engine.summarize().await.expect("summarize");
    assert_eq!((report.summaries, report.deleted), (0, 0));
    assert_eq!(engine.health().expect("health").memory_count, 2);
}

#[tokio::test]
async fn summarize_replaces_low_importance_groups() {
    let temp = tempdir().expect("tempdir");
    let mut options = options(&temp);
    options.compaction.threshold = 4;
    let mut engine = MemoryEngine::open(options, Arc::new(StubEmbedder::new())).expect("open");

    for (index, importance) in [0.3, 0.2, 0.1].into_iter().enumerate() {
        engine
            .add_memory(
                MemoryInput::new(format!("fact number {index}"), MemoryCategory::Fact)
                    .with_importance(importance)
                    .with_timestamp(1_000 + index as i64),
            )
            .await
            .expect("add");
    }
    let keeper = engine
        .add_memory(MemoryInput::new("critical fact", MemoryCategory::Fact).with_importance(0.9))
        .await
        .expect("add");
    engine
        .add_memory(MemoryInput::new("lonely lesson", MemoryCategory::Lesson).with_importance(0.1))
        .await
        .expect("add");

    let report = engine.summarize().await.expect("summarize");
    assert_eq!((report.summaries, report.deleted), (1, 3));

    let summaries = engine
        .list(&ListOptions {
            tags: vec!["summary".to_string()],
            ..ListOptions::default()
        })
        .expect("list");
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.category, MemoryCategory::Fact);
    assert_eq!(summary.importance, 0.7);
    assert!(summary.content.starts_with("Summary (fact) 1970-01-01T00:00:01.000Z - "));
    assert!(summary.content.ends_with("fact number 0 fact number 1 fact number 2"));

    assert!(engine.get(&keeper.id).expect("get").is_some());
    assert_eq!(engine.health().expect("health").memory_count, 3);
}

#[tokio::test]
async fn compaction_counts_only_sources_still_present() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);
    for (index, content) in ["first fact", "second fact", "third fact"].into_iter().enumerate() {
        engine
            .add_memory(
                MemoryInput::new(content, MemoryCategory::Fact)
                    .with_importance(0.2)
                    .with_timestamp(1_000 + index as i64),
            )
            .await
            .expect("add");
    }

    let records = engine.export().expect("export");
    let mut plans = plan_compaction(&records, 12, 0.7, now_millis());
    assert_eq!(plans.len(), 1);
    let plan = plans.remove(0);
    assert_eq!(plan.source_ids.len(), 3);
    assert!(engine.delete(&plan.source_ids[0]).expect("delete"));

    let removed = engine.apply_compaction_plan(plan).await.expect("apply");
    assert_eq!(removed, 2);
    let remaining = engine.export().expect("export");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].tags, vec!["summary".to_string()]);
}

#[tokio::test]
async fn decay_rewrites_only_changed_importance() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);
    let now = now_millis();

    let at_floor = engine
        .add_memory(
            MemoryInput::new("already at the floor", MemoryCategory::Episode)
                .with_importance(0.05)
                .with_timestamp(now - 10 * MILLIS_PER_DAY),
        )
        .await
        .expect("add");
    let not_yet_aged = engine
        .add_memory(
            MemoryInput::new("scheduled for tomorrow", MemoryCategory::Episode)
                .with_importance(0.6)
                .with_timestamp(now + MILLIS_PER_DAY),
        )
        .await
        .expect("add");
    let aging = engine
        .add_memory(
            MemoryInput::new("three weeks ago", MemoryCategory::Episode)
                .with_importance(0.8)
                .with_timestamp(now - 20 * MILLIS_PER_DAY),
        )
        .await
        .expect("add");

    let report = engine.decay().expect("decay");
    assert_eq!((report.updated, report.pruned), (1, 0));

    let records = engine.export().expect("export");
    let importance_of = |id: &str| {
        records
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.importance)
            .expect("record present")
    };
    assert_eq!(importance_of(&at_floor.id), 0.05);
    assert_eq!(importance_of(&not_yet_aged.id), 0.6);
    assert!(importance_of(&aging.id) < 0.8);
}

#[tokio::test]
async fn decay_ages_importance_and_prunes_old_low_value_records() {
    let temp = tempdir().expect("tempdir");
    let mut engine = open(&temp);
    let now = now_millis();

    let ancient = engine
        .add_memory(
            MemoryInput::new("ancient trivia", MemoryCategory::Episode)
                .with_importance(0.09)
                .with_timestamp(now - 400 * MILLIS_PER_DAY),
        )
        .await
        .expect("add");
    let month_old = engine
        .add_memory(
            MemoryInput::new("last month's standup", MemoryCategory::Episode)
                .with_importance(0.8)
                .with_timestamp(now - 30 * MILLIS_PER_DAY),
        )
        .await
        .expect("add");
    let fresh_but_minor = engine
        .add_memory(MemoryInput::new("minor note", MemoryCategory::Episode).with_importance(0.05))
        .await
        .expect("add");

    let report = engine.decay().expect("decay");
    assert_eq!(report.pruned, 1);
    assert_eq!(report.updated, 2);

    let records = engine.export().expect("export");
    let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
    assert!(!ids.contains(&ancient.id.as_str()));
    assert!(ids.contains(&fresh_but_minor.id.as_str()));

    let aged = records
        .iter()
        .find(|record| record.id == month_old.id)
        .expect("month old record");
    let expected = 0.8 * (-0.05f64 * 30.0).exp();
    assert!((aged.importance - expected).abs() < 1e-3);
    for record in &records {
        assert!((0.0..=1.0).contains(&record.importance));
    }
}
