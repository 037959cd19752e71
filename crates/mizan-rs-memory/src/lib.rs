//! Durable, semantically searchable memory for Mizan agents.

pub mod compaction;
pub mod decay;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod model;
pub mod search;
pub mod store;
pub mod wal;

/// Compaction planner and policy.
pub use compaction::{CompactionPlan, CompactionPolicy, plan_compaction};
/// Decay function and policy.
pub use decay::{DecayPolicy, decayed_importance};
/// Embedding capability.
pub use embedding::{Embedder, OpenAiEmbedder, cosine_similarity};
/// Engine and its construction options.
pub use engine::{EngineOptions, MemoryEngine};
/// Memory error types.
pub use error::{MemoryError, ValidationError};
/// Memory data model.
pub use model::{
    DecayReport, HealthStatus, ListOptions, MemoryCategory, MemoryInput, MemoryRecord,
    SearchOptions, SearchResult, SummarizeReport,
};
/// Record store.
pub use store::MemoryStore;
/// Durability log.
pub use wal::{DurabilityLog, LogEntry, LogMutation, LogOperation};
