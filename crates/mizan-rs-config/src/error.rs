//! Errors raised while assembling a `MizanConfig`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read, parse, decode, or validate Mizan configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer file (or the working directory) exists but could not be read.
    #[error("cannot read config {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A `--config` layer that does not exist.
    #[error("runtime config layer not found: {}", .0.display())]
    MissingRuntimeLayer(PathBuf),
    /// The layer is not valid JSON5.
    #[error("{layer} is not valid JSON5: {source}")]
    ParseFailed {
        layer: String,
        source: json5::Error,
    },
    /// The merged value does not fit `MizanConfig`.
    #[error("{layer} does not match the config model: {source}")]
    DecodeFailed {
        layer: String,
        source: serde_json::Error,
    },
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// An environment override could not be applied.
    #[error("invalid environment override {name}={value}: {message}")]
    InvalidEnv {
        name: String,
        value: String,
        message: String,
    },
}
