//! Error types for memory operations.

use std::path::PathBuf;

/// Input rejected before any embedding, log, or store work happens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Content was empty after trimming.
    #[error("memory content is required")]
    EmptyContent,
    /// Category string is not one of the closed set.
    #[error("invalid memory category: {0}")]
    InvalidCategory(String),
    /// Importance outside [0, 1] or not finite.
    #[error("importance must be within [0, 1], got {0}")]
    InvalidImportance(f64),
    /// Search query was blank.
    #[error("search query cannot be empty")]
    EmptyQuery,
    /// Delete was called without an id.
    #[error("memory id is required")]
    MissingId,
}

/// Errors returned by the memory engine and its components.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Caller input failed validation.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// The embedding capability cannot run (e.g. no credential configured).
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// The embedding call ran but produced no usable vector.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),
    /// A record with the same id already exists.
    #[error("duplicate memory id: {0}")]
    DuplicateId(String),
    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A durability log line could not be parsed.
    #[error("malformed log entry at {}:{line}: {source}", .path.display())]
    MalformedLogEntry {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MemoryError {
    /// True when the error is a caller mistake rather than an operational failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, MemoryError::Validation(_))
    }
}
