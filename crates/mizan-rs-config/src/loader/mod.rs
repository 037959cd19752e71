//! Layered configuration loader.
//!
//! Discovers configuration layers (system/user/cwd/runtime), validates schema,
//! merges them, and produces a final `MizanConfig`.

mod layer_io;
mod merge;
mod schema;


use crate::{ConfigError, MizanConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "mizan.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".mizan";

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/mizan/mizan.json5";
#[cfg(windows)]
/// Default system config path on Windows.
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\mizan\\mizan.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: MizanConfig,
    /// Metadata for each layer loaded.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the cwd layer.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/mizan/mizan.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.mizan/mizan.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last. These must exist.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl MizanConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let value = layer_io::parse_json5(&contents, "config")?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value = layer_io::parse_json5(contents, "config")?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Layer precedence (low -> high): system, user, cwd, runtime overrides.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layer_io::resolve_cwd(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();

        let cwd_path = cwd.join(DEFAULT_CONFIG_FILE);
        for (source, path) in [
            (
                ConfigLayerSource::System,
                options.system_config_path.as_deref(),
            ),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
            (ConfigLayerSource::Cwd, Some(cwd_path.as_path())),
        ] {
            let Some(path) = path else {
                continue;
            };
            let Some(layer) = layer_io::read_optional(source, path)? else {
                continue;
            };
            if !seen_paths.insert(layer_io::layer_identity(path)) {
                debug!(
                    "skipping duplicate layer (source={}, path={})",
                    source.name(),
                    path.display()
                );
                continue;
            }
            apply_layer(&mut merged, layer, &mut layers);
        }

        for runtime_path in &options.runtime_paths {
            let layer = layer_io::read_runtime(runtime_path)?;
            apply_layer(&mut merged, layer, &mut layers);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(invalid("store.path", "must not be empty"));
        }
        if self.log.path.trim().is_empty() {
            return Err(invalid("log.path", "must not be empty"));
        }
        if self.log.flush_threshold == 0 {
            return Err(invalid("log.flush_threshold", "must be at least 1"));
        }
        if self.embedding.provider != "openai" {
            return Err(invalid(
                "embedding.provider",
                &format!("unsupported provider '{}'", self.embedding.provider),
            ));
        }
        if self.embedding.dimensions == Some(0) {
            return Err(invalid("embedding.dimensions", "must be positive"));
        }
        if !self.decay.rate.is_finite() || self.decay.rate < 0.0 {
            return Err(invalid("decay.rate", "must be a non-negative number"));
        }
        for (path, value) in [
            ("decay.floor", self.decay.floor),
            ("decay.prune_below", self.decay.prune_below),
            (
                "compaction.preserve_importance",
                self.compaction.preserve_importance,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(path, "must be within [0, 1]"));
            }
        }
        if self.decay.prune_after_days < 0 {
            return Err(invalid("decay.prune_after_days", "must not be negative"));
        }
        if self.compaction.max_group_size < 2 {
            return Err(invalid("compaction.max_group_size", "must be at least 2"));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(invalid("server.body_limit_bytes", "must be positive"));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn apply_layer(merged: &mut Value, layer: LoadedLayer, layers: &mut Vec<ConfigLayer>) {
    let overridden = merge::overlay_layer(merged, &layer.value);
    debug!(
        "applied config layer (source={}, keys=[{}])",
        layer.meta.source.name(),
        overridden.join(", ")
    );
    layers.push(layer.meta);
}

fn config_from_value(value: Value, label: &str) -> Result<MizanConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: MizanConfig =
        serde_json::from_value(value).map_err(|source| ConfigError::DecodeFailed {
            layer: label.to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

fn invalid(path: &str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_string(),
        message: message.to_string(),
    }
}
