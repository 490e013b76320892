//! Configuration loading and management.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Redundancy detector configuration.
    pub redundancy: RedundancyConfig,
    /// Dead code analysis configuration.
    pub deadcode: DeadCodeConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Env vars with `ARGUS_` prefix
    /// override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("ARGUS_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from a directory, looking for argus.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("argus.toml")))
            .merge(Env::prefixed("ARGUS_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Create default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }
}

/// Redundancy (duplicate-function) detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedundancyConfig {
    /// Minimum body line count for a function to enter the funnel.
    pub min_body_lines: usize,
    /// Pairs below this similarity are discarded.
    pub low_similarity: f64,
    /// Pairs at or above this similarity are reported without asking
    /// the oracle.
    pub auto_confirm: f64,
    /// Maximum concurrent in-flight oracle calls.
    pub oracle_concurrency: usize,
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            min_body_lines: 3,
            low_similarity: 0.6,
            auto_confirm: 0.9,
            oracle_concurrency: 4,
        }
    }
}

/// Dead code analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadCodeConfig {
    /// Qualified names used as reachability roots. Empty means fall back
    /// to the in-degree-zero heuristic.
    pub entry_points: Vec<String>,
}
