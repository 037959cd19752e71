//! Configuration models and layered config loading.
//!
//! This crate owns the Mizan config schema, validation, layer-merging, and
//! environment override logic used by the CLI and server.

mod env;
mod error;
mod loader;
mod model;

/// Environment variable names recognised by overrides.
pub use env::{ENV_API_KEY, ENV_DB_PATH, ENV_PORT, ENV_WAL_PATH};
/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
