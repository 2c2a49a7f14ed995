// src/index/suppress.rs
//! The suppression set: wl_hashes the user has reviewed and muted.
//!
//! Filtering by suppression is a presentation concern; the index never
//! consults this set. Persisted as one hash per line.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SuppressionSet {
    hashes: BTreeSet<String>,
}

impl SuppressionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; returns true when the hash was newly added.
    pub fn add(&mut self, wl_hash: &str) -> bool {
        self.hashes.insert(wl_hash.to_string())
    }

    /// No-op for absent hashes; returns true when something was removed.
    pub fn remove(&mut self, wl_hash: &str) -> bool {
        self.hashes.remove(wl_hash)
    }

    #[must_use]
    pub fn contains(&self, wl_hash: &str) -> bool {
        self.hashes.contains(wl_hash)
    }

    /// Sorted, for stable display.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.hashes.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// # Errors
    ///
    /// Returns a persistence error when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        for hash in &self.hashes {
            out.push_str(hash);
            out.push('\n');
        }
        std::fs::write(path, out).map_err(|e| Error::persistence(path, e))
    }

    /// A missing file loads as an empty set.
    ///
    /// # Errors
    ///
    /// Returns a persistence error for unreadable (but existing) files.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::persistence(path, e)),
        };
        let hashes = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut set = SuppressionSet::new();
        assert!(set.add("abc"));
        assert!(!set.add("abc"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut set = SuppressionSet::new();
        assert!(!set.remove("missing"));
        assert!(set.is_empty());
    }
}
