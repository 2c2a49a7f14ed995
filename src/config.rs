// src/config.rs
//! Runtime configuration.
//!
//! A single immutable `Config` is constructed at startup, optionally merged
//! with a local `.dupgraph.toml`, validated once, and passed by reference to
//! everything that needs it.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Directories never descended into during codebase indexing.
pub const PRUNE_DIRS: &[&str] = &[
    ".git",
    ".dupgraph",
    "__pycache__",
    ".venv",
    "venv",
    "node_modules",
    "dist",
    "build",
    "target",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// Weisfeiler-Leman refinement iterations. Persisted with the index so
    /// two indexes can be checked for hash-alphabet compatibility.
    pub wl_iterations: usize,
    /// Extract nested control-flow blocks in addition to functions.
    pub include_blocks: bool,
    /// Blocks nested deeper than this are not extracted.
    pub max_block_depth: usize,
    /// Per-call wall-clock budget for VF2 verification.
    pub verify_budget: Duration,
    /// Watch the indexed root and re-index changed files.
    pub event_driven: bool,
    pub verbose: bool,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self {
            wl_iterations: 3,
            include_blocks: true,
            max_block_depth: 10,
            verify_budget: Duration::from_secs(2),
            event_driven: false,
            verbose: false,
        }
    }

    /// Merges overrides from `.dupgraph.toml` in `dir`, if present.
    /// A missing file is not an error; an unreadable one is ignored.
    pub fn load_local_config(&mut self, dir: &Path) {
        let path = dir.join(".dupgraph.toml");
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return;
        };
        let Ok(overrides) = toml::from_str::<ConfigOverrides>(&raw) else {
            return;
        };
        if let Some(k) = overrides.wl_iterations {
            self.wl_iterations = k;
        }
        if let Some(b) = overrides.include_blocks {
            self.include_blocks = b;
        }
        if let Some(d) = overrides.max_block_depth {
            self.max_block_depth = d;
        }
        if let Some(ms) = overrides.verify_budget_ms {
            self.verify_budget = Duration::from_millis(ms);
        }
        if let Some(e) = overrides.event_driven {
            self.event_driven = e;
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for values the pipeline cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.wl_iterations == 0 {
            return Err(Error::InvalidInput(
                "wl_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_block_depth == 0 {
            return Err(Error::InvalidInput(
                "max_block_depth must be at least 1".to_string(),
            ));
        }
        if self.verify_budget.is_zero() {
            return Err(Error::InvalidInput(
                "verify_budget must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    wl_iterations: Option<usize>,
    include_blocks: Option<bool>,
    max_block_depth: Option<usize>,
    verify_budget_ms: Option<u64>,
    event_driven: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::new().validate().is_ok());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = Config::new();
        config.wl_iterations = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidInput(_))
        ));
    }
}
