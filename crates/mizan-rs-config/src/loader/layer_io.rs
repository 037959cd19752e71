//! Finding and reading `mizan.json5` layers on disk.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

impl ConfigLayerSource {
    /// Short name used in error labels and logs.
    pub fn name(self) -> &'static str {
        match self {
            ConfigLayerSource::System => "system",
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Runtime => "runtime",
        }
    }
}

/// Read the layer at `path`; an absent file yields `None`.
pub(super) fn read_optional(
    source: ConfigLayerSource,
    path: &Path,
) -> Result<Option<LoadedLayer>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_layer(source, path, &contents).map(Some),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(
                "config layer absent (source={}, path={})",
                source.name(),
                path.display()
            );
            Ok(None)
        }
        Err(err) => Err(ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

/// Read a `--config` layer, which must exist.
pub(super) fn read_runtime(path: &Path) -> Result<LoadedLayer, ConfigError> {
    read_optional(ConfigLayerSource::Runtime, path)?
        .ok_or_else(|| ConfigError::MissingRuntimeLayer(path.to_path_buf()))
}

fn parse_layer(
    source: ConfigLayerSource,
    path: &Path,
    contents: &str,
) -> Result<LoadedLayer, ConfigError> {
    let label = format!("{}({})", source.name(), path.display());
    let value = parse_json5(contents, &label)?;
    schema::validate_layer_schema(&value, &label)?;
    Ok(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    })
}

/// Parse JSON5 text, naming `layer` on failure.
pub(super) fn parse_json5(contents: &str, layer: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::ParseFailed {
        layer: layer.to_string(),
        source,
    })
}

/// `/etc/mizan/mizan.json5` on Unix, the ProgramData equivalent on Windows.
pub(super) fn default_system_config_path() -> Option<PathBuf> {
    #[cfg(any(unix, windows))]
    {
        Some(PathBuf::from(super::SYSTEM_CONFIG_PATH))
    }
    #[cfg(not(any(unix, windows)))]
    {
        None
    }
}

/// `~/.mizan/mizan.json5`, when a home directory is known.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

/// Canonical working directory. One that does not exist is kept as given.
pub(super) fn resolve_cwd(cwd: &Path) -> Result<PathBuf, ConfigError> {
    match cwd.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(cwd.to_path_buf()),
        Err(err) => Err(ConfigError::ReadFailed {
            path: cwd.to_path_buf(),
            source: err,
        }),
    }
}

/// Identity of a layer file, so one file reached through two layers applies once.
pub(super) fn layer_identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
