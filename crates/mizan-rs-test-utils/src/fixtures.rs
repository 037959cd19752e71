use crate::embedder::StubEmbedder;
use mizan_rs_memory::{MemoryCategory, MemoryRecord};

/// Build a stored-shape record with a stub embedding of its content.
pub fn record_fixture(
    id: &str,
    content: &str,
    category: MemoryCategory,
    importance: f64,
    timestamp: i64,
) -> MemoryRecord {
    MemoryRecord {
        id: id.to_string(),
        content: content.to_string(),
        category,
        tags: Vec::new(),
        timestamp,
        importance,
        embedding: StubEmbedder::vector(content),
        last_accessed: timestamp,
    }
}
