//! Memory engine: orchestrates the durability log, record store, embedder,
//! ranker, decay, and compaction.

use crate::compaction::{CompactionPlan, CompactionPolicy, plan_compaction};
use crate::decay::{DecayPolicy, decayed_importance};
use crate::embedding::Embedder;
use crate::error::{MemoryError, ValidationError};
use crate::model::{
    DecayReport, HealthStatus, ListOptions, MILLIS_PER_DAY, MemoryInput, MemoryRecord,
    SearchOptions, SearchResult, SummarizeReport, now_millis,
};
use crate::search::rank;
use crate::store::MemoryStore;
use crate::wal::{DurabilityLog, LogMutation};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Importance assigned when the input does not specify one.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;
/// Importance boost applied to every search hit.
pub const SEARCH_BOOST: f64 = 0.03;
/// Importance boost applied by `get`.
pub const GET_BOOST: f64 = 0.02;
/// Writes between automatic log flushes unless configured otherwise.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 20;

/// Construction parameters for [`MemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// SQLite database location.
    pub store_path: PathBuf,
    /// Durability log location.
    pub log_path: PathBuf,
    /// Logged writes before the log is cleared automatically.
    pub flush_threshold: usize,
    pub decay: DecayPolicy,
    pub compaction: CompactionPolicy,
    /// Expected embedding length. When unset, the length of the first stored
    /// embedding is expected instead.
    pub embedding_dimensions: Option<usize>,
}

impl EngineOptions {
    pub fn new(store_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            log_path: log_path.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            decay: DecayPolicy::default(),
            compaction: CompactionPolicy::default(),
            embedding_dimensions: None,
        }
    }
}

/// Single-actor memory engine over one store/log pair.
pub struct MemoryEngine {
    store: MemoryStore,
    log: DurabilityLog,
    embedder: Arc<dyn Embedder>,
    options: EngineOptions,
    dimensions: Option<usize>,
    pending_writes: usize,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("store", &self.store.path())
            .field("log", &self.log.path())
            .field("embedder", &self.embedder.model())
            .field("dimensions", &self.dimensions)
            .field("pending_writes", &self.pending_writes)
            .finish()
    }
}

impl MemoryEngine {
    /// Open the store and log, then replay any logged intents.
    pub fn open(options: EngineOptions, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        let log = DurabilityLog::open(&options.log_path)?;
        let store = MemoryStore::open(&options.store_path)?;
        let mut engine = Self {
            store,
            log,
            embedder,
            dimensions: options.embedding_dimensions,
            options,
            pending_writes: 0,
        };
        engine.recover()?;
        if engine.dimensions.is_none() {
            engine.dimensions = engine.store.embedding_dimensions()?;
        }
        info!(
            "memory engine ready (store={}, log={}, records={})",
            engine.store.path().display(),
            engine.log.path().display(),
            engine.store.count()?
        );
        Ok(engine)
    }

    /// Options the engine was opened with.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Validate, embed, log, and store a new memory.
    pub async fn add_memory(&mut self, input: MemoryInput) -> Result<MemoryRecord, MemoryError> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let importance = input.importance.unwrap_or(DEFAULT_IMPORTANCE);
        if !importance.is_finite() || !(0.0..=1.0).contains(&importance) {
            return Err(ValidationError::InvalidImportance(importance).into());
        }
        let tags: Vec<String> = input
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        let timestamp = input.timestamp.unwrap_or_else(now_millis);

        let embedder = Arc::clone(&self.embedder);
        let embedding = embedder.embed(&content).await?;
        self.check_dimensions(&embedding)?;

        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            content,
            category: input.category,
            tags,
            timestamp,
            importance,
            embedding,
            last_accessed: timestamp,
        };
        self.log.append_add(&record)?;
        self.store.add_memory(&record)?;
        if self.dimensions.is_none() {
            self.dimensions = Some(record.embedding.len());
        }
        debug!(
            "stored memory record (id={}, category={})",
            record.id, record.category
        );
        self.note_write()?;
        Ok(record)
    }

    /// Hybrid search. Every hit is boosted and touched.
    pub async fn search(
        &mut self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let candidates = self.store.get_all_memories()?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let embedder = Arc::clone(&self.embedder);
        let query_embedding = embedder.embed(query).await?;
        self.check_dimensions(&query_embedding)?;
        let mismatched = candidates
            .iter()
            .filter(|record| record.embedding.len() != query_embedding.len())
            .count();
        if mismatched > 0 {
            warn!(
                "records with mismatched embedding length score zero similarity (count={}, expected={})",
                mismatched,
                query_embedding.len()
            );
        }

        let mut results = rank(candidates, &query_embedding, query, options);
        let now = now_millis();
        for result in &mut results {
            self.touch(&mut result.record, SEARCH_BOOST, now)?;
        }
        debug!("search completed (results={})", results.len());
        Ok(results)
    }

    /// Filtered listing with no side effects.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.store.list_memories(options)
    }

    /// Fetch by id, boosting and touching the record on a hit.
    pub fn get(&mut self, id: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let Some(mut record) = self.store.get_memory(id)? else {
            return Ok(None);
        };
        self.touch(&mut record, GET_BOOST, now_millis())?;
        Ok(Some(record))
    }

    /// Log and apply a delete. Returns whether a record was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, MemoryError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingId.into());
        }
        self.log.append_delete(id)?;
        let removed = self.store.delete_memory(id)?;
        debug!("deleted memory record (id={id}, removed={removed})");
        self.note_write()?;
        Ok(removed)
    }

    /// Fold low-importance records into per-category summaries once the
    /// store reaches the compaction threshold.
    pub async fn summarize(&mut self) -> Result<SummarizeReport, MemoryError> {
        let count = self.store.count()?;
        let policy = self.options.compaction;
        if count < policy.threshold {
            debug!(
                "skipping compaction (records={count}, threshold={})",
                policy.threshold
            );
            return Ok(SummarizeReport::default());
        }

        let records = self.store.get_all_memories()?;
        let plans = plan_compaction(
            &records,
            policy.max_group_size,
            policy.preserve_importance,
            now_millis(),
        );
        let mut report = SummarizeReport::default();
        for plan in plans {
            report.deleted += self.apply_compaction_plan(plan).await?;
            report.summaries += 1;
        }
        info!(
            "compaction finished (summaries={}, deleted={})",
            report.summaries, report.deleted
        );
        Ok(report)
    }

    /// Store the plan's summary through the normal add path, then delete its
    /// sources. Returns how many sources were actually removed.
    pub async fn apply_compaction_plan(&mut self, plan: CompactionPlan) -> Result<usize, MemoryError> {
        let summary = self.add_memory(plan.summary).await?;
        let mut removed = 0;
        for id in &plan.source_ids {
            if self.delete(id)? {
                removed += 1;
            }
        }
        debug!(
            "applied compaction plan (summary={}, sources={}, removed={removed})",
            summary.id,
            plan.source_ids.len()
        );
        Ok(removed)
    }

    /// Age every record's importance, then prune old low-value records.
    pub fn decay(&mut self) -> Result<DecayReport, MemoryError> {
        let policy = self.options.decay;
        let now = now_millis();
        let mut report = DecayReport::default();
        for record in self.store.get_all_memories()? {
            let importance = decayed_importance(&record, now, &policy);
            if importance != record.importance {
                self.store.update_importance(&record.id, importance)?;
                report.updated += 1;
            }
        }
        let cutoff = now.saturating_sub(policy.prune_after_days.saturating_mul(MILLIS_PER_DAY));
        report.pruned = self
            .store
            .prune_below_importance(policy.prune_below, cutoff)?;
        info!(
            "decay finished (updated={}, pruned={})",
            report.updated, report.pruned
        );
        Ok(report)
    }

    /// Clear the log and reset the pending-write counter.
    pub fn flush_wal(&mut self) -> Result<(), MemoryError> {
        self.log.clear()?;
        self.pending_writes = 0;
        info!("flushed durability log (path={})", self.log.path().display());
        Ok(())
    }

    pub fn health(&self) -> Result<HealthStatus, MemoryError> {
        Ok(HealthStatus {
            ok: true,
            memory_count: self.store.count()?,
            db_path: self.store.path().display().to_string(),
            wal_path: self.log.path().display().to_string(),
        })
    }

    /// Every record, newest first.
    pub fn export(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.store.list_memories(&ListOptions::default())
    }

    /// Close the underlying store.
    pub fn close(self) -> Result<(), MemoryError> {
        info!("closing memory engine (store={})", self.store.path().display());
        self.store.close()
    }

    fn recover(&mut self) -> Result<(), MemoryError> {
        let entries = self.log.read_all()?;
        if entries.is_empty() {
            return Ok(());
        }
        let total = entries.len();
        for entry in entries {
            match entry.mutation {
                LogMutation::Add(record) => self.store.upsert_memory(&record)?,
                LogMutation::Delete(id) => {
                    self.store.delete_memory(&id)?;
                }
            }
        }
        info!("replayed durability log (entries={total})");
        self.flush_wal()
    }

    fn note_write(&mut self) -> Result<(), MemoryError> {
        self.pending_writes += 1;
        if self.pending_writes >= self.options.flush_threshold {
            self.flush_wal()?;
        }
        Ok(())
    }

    /// Boost importance (capped at 1) and refresh the access time, persisting both.
    fn touch(&self, record: &mut MemoryRecord, boost: f64, now: i64) -> Result<(), MemoryError> {
        record.importance = (record.importance + boost).min(1.0);
        record.last_accessed = now.max(record.timestamp);
        self.store.update_access(&record.id, record.last_accessed)?;
        self.store.update_importance(&record.id, record.importance)?;
        Ok(())
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), MemoryError> {
        if embedding.is_empty() {
            return Err(MemoryError::EmbeddingFailed(
                "embedder returned an empty vector".to_string(),
            ));
        }
        match self.dimensions {
            Some(expected) if expected != embedding.len() => Err(MemoryError::EmbeddingFailed(
                format!(
                    "expected {expected} dimensions, got {}",
                    embedding.len()
                ),
            )),
            _ => Ok(()),
        }
    }
}
