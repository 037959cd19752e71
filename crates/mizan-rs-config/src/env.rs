//! Environment variable overrides applied on top of file layers.

use crate::{ConfigError, MizanConfig};
use log::debug;

/// Overrides `store.path`.
pub const ENV_DB_PATH: &str = "MEMORY_DB_PATH";
/// Overrides `log.path`.
pub const ENV_WAL_PATH: &str = "MEMORY_WAL_PATH";
/// Overrides `embedding.api_key`.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Overrides `server.port`.
pub const ENV_PORT: &str = "MEMORY_PORT";

impl MizanConfig {
    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to read variables. Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(path) = read(ENV_DB_PATH) {
            debug!("applying env override (name={ENV_DB_PATH})");
            self.store.path = path;
        }
        if let Some(path) = read(ENV_WAL_PATH) {
            debug!("applying env override (name={ENV_WAL_PATH})");
            self.log.path = path;
        }
        if let Some(key) = read(ENV_API_KEY) {
            debug!("applying env override (name={ENV_API_KEY})");
            self.embedding.api_key = Some(key);
        }
        if let Some(port) = read(ENV_PORT) {
            debug!("applying env override (name={ENV_PORT})");
            self.server.port = port
                .trim()
                .parse()
                .map_err(|err: std::num::ParseIntError| ConfigError::InvalidEnv {
                    name: ENV_PORT.to_string(),
                    value: port.clone(),
                    message: err.to_string(),
                })?;
        }
        self.validate()
    }
}
