//! Configuration schema for Mizan.

use serde::{Deserialize, Serialize};

/// Root config for the Mizan memory service.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MizanConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub decay: DecayConfig,
    #[serde(default)]
    pub compaction: CompactionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// SQLite database path, relative to the working directory when not absolute.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "memory.db".to_string()
}

/// Durability log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: String,
    /// Logged writes before the log is cleared.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            flush_threshold: default_flush_threshold(),
        }
    }
}

fn default_log_path() -> String {
    "memory.wal".to_string()
}

fn default_flush_threshold() -> usize {
    20
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Expected vector length; unchecked when unset.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            api_key: None,
            dimensions: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Importance decay and pruning settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DecayConfig {
    #[serde(default = "default_decay_rate")]
    pub rate: f64,
    #[serde(default = "default_decay_floor")]
    pub floor: f64,
    #[serde(default = "default_prune_below")]
    pub prune_below: f64,
    #[serde(default = "default_prune_after_days")]
    pub prune_after_days: i64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rate: default_decay_rate(),
            floor: default_decay_floor(),
            prune_below: default_prune_below(),
            prune_after_days: default_prune_after_days(),
        }
    }
}

fn default_decay_rate() -> f64 {
    0.05
}

fn default_decay_floor() -> f64 {
    0.05
}

fn default_prune_below() -> f64 {
    0.1
}

fn default_prune_after_days() -> i64 {
    365
}

/// Summarization settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompactionConfig {
    /// Record count below which summarize does nothing.
    #[serde(default = "default_compaction_threshold")]
    pub threshold: usize,
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    #[serde(default = "default_preserve_importance")]
    pub preserve_importance: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            threshold: default_compaction_threshold(),
            max_group_size: default_max_group_size(),
            preserve_importance: default_preserve_importance(),
        }
    }
}

fn default_compaction_threshold() -> usize {
    200
}

fn default_max_group_size() -> usize {
    12
}

fn default_preserve_importance() -> f64 {
    0.7
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Maximum accepted request body size.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3200
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}
