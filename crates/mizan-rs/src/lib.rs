//! Public surface for Mizan.
//!
//! Re-exports the building blocks and wires a loaded config into a running
//! engine so the CLI and embedders set up the same way.

pub mod duration;

/// Re-export for convenience.
pub use mizan_rs_config as config;
/// Re-export for convenience.
pub use mizan_rs_memory as memory;
/// Re-export for convenience.
pub use mizan_rs_server as server;

use mizan_rs_config::MizanConfig;
use mizan_rs_memory::{
    CompactionPolicy, DecayPolicy, Embedder, EngineOptions, MemoryEngine, MemoryError,
    OpenAiEmbedder,
};
use std::path::Path;
use std::sync::Arc;

/// Initialize `env_logger` with millisecond timestamps, honoring `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}

/// Engine options from config. Relative paths resolve against `base_dir`.
pub fn engine_options(config: &MizanConfig, base_dir: &Path) -> EngineOptions {
    let mut options = EngineOptions::new(
        base_dir.join(&config.store.path),
        base_dir.join(&config.log.path),
    );
    options.flush_threshold = config.log.flush_threshold;
    options.decay = DecayPolicy {
        rate: config.decay.rate,
        floor: config.decay.floor,
        prune_below: config.decay.prune_below,
        prune_after_days: config.decay.prune_after_days,
    };
    options.compaction = CompactionPolicy {
        threshold: config.compaction.threshold,
        max_group_size: config.compaction.max_group_size,
        preserve_importance: config.compaction.preserve_importance,
    };
    options.embedding_dimensions = config.embedding.dimensions;
    options
}

/// Embedder described by the `embedding` config section.
pub fn build_embedder(config: &MizanConfig) -> Arc<dyn Embedder> {
    Arc::new(
        OpenAiEmbedder::new(config.embedding.api_key.clone())
            .with_base_url(config.embedding.base_url.clone())
            .with_model(config.embedding.model.clone()),
    )
}

/// Open an engine for `config` with the configured embedder.
pub fn open_engine(config: &MizanConfig, base_dir: &Path) -> Result<MemoryEngine, MemoryError> {
    MemoryEngine::open(engine_options(config, base_dir), build_embedder(config))
}
