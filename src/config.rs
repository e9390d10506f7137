//! TOML-based configuration loaded from `hearth.toml`.
//!
//! Every field has a default, so a missing config file yields a fully
//! usable local setup; a malformed file is a fatal startup error.

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub scoring: ScoringConfig,
    pub data: DataConfig,
}

impl HearthConfig {
    /// Load configuration from a TOML file. A missing file falls back to
    /// defaults; a malformed one aborts startup.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| AppError::Config(format!("Malformed config {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// OpenAI-compatible API root.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key, if the endpoint needs one.
    pub api_key_env: Option<String>,
    /// Per-request timeout; an expired call degrades like any other failure.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.2".to_string(),
            api_key_env: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Number of concurrent scoring groups per batch.
    pub group_count: usize,
    /// Scores below this are discarded.
    pub score_cutoff: u8,
    pub primary_weight: f64,
    pub commute_weight: f64,
    /// Concurrent commute-enrichment calls, independent of candidate count.
    pub max_concurrency: usize,
    /// Maximum results returned per search.
    pub result_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            group_count: 5,
            score_cutoff: 60,
            primary_weight: 0.6,
            commute_weight: 0.4,
            max_concurrency: 8,
            result_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Flat JSON array of listings produced by the scraper.
    pub listings_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            listings_path: "./data/listings.json".to_string(),
        }
    }
}
