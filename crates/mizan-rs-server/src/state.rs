//! Shared state for route handlers.

use mizan_rs_memory::MemoryEngine;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle to the single engine instance. The mutex serializes operations.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<MemoryEngine>>,
}

impl AppState {
    pub fn new(engine: MemoryEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }
}
