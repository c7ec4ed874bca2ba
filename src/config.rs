//! Engine configuration.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs for the closure computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Unit count from which closure relaxation and path trees run on the rayon pool.
    pub parallel_threshold: usize,

    /// Precompute one shortest-path tree per source unit at rebuild time.
    /// When off, transform queries run their own breadth-first search.
    pub cache_paths: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallel_threshold: 64, cache_paths: true }
    }
}

impl EngineConfig {
    /// Reads `CONVERSION_PARALLEL_THRESHOLD` and `CONVERSION_CACHE_PATHS`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("CONVERSION_PARALLEL_THRESHOLD") {
            config.parallel_threshold = raw.trim().parse().map_err(|_| {
                EngineError::Config(format!("CONVERSION_PARALLEL_THRESHOLD is not a count: '{}'", raw))
            })?;
        }
        if let Ok(raw) = std::env::var("CONVERSION_CACHE_PATHS") {
            config.cache_paths = parse_flag(&raw).ok_or_else(|| {
                EngineError::Config(format!("CONVERSION_CACHE_PATHS is not a boolean: '{}'", raw))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        let config: Self = serde_json::from_str(&data).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallel_threshold == 0 {
            return Err(EngineError::Config("parallel_threshold must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
