// src/index/mod.rs
//! The duplicate index.
//!
//! Maps wl_hash → bucket of indexed code units. Owned by a single indexer;
//! mutation is not concurrent-safe, read-only queries are.

pub mod suppress;

pub use suppress::SuppressionSet;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::{code_unit_to_graph, source_to_graph, AstGraph};
use crate::hash::{
    fingerprints_compatible, structural_fingerprint, weisfeiler_leman_hash, Fingerprint,
};
use crate::isomorphism::{are_isomorphic, Verdict};
use crate::parse::{extract_code_units, CodeUnit, ExtractOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// One indexed code unit with everything precomputed for comparison.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub code_unit: CodeUnit,
    pub graph: AstGraph,
    pub wl_hash: String,
    pub fingerprint: Fingerprint,
    pub node_count: usize,
}

impl IndexEntry {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.code_unit.line_count()
    }
}

/// Equivalence class under wl_hash. `is_verified` flips to true only after
/// a successful isomorphism check on some pair in the group; there is no
/// reverse transition short of rebuilding the index.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub wl_hash: String,
    pub entries: Vec<IndexEntry>,
    pub is_verified: bool,
}

impl DuplicateGroup {
    #[must_use]
    pub fn new(wl_hash: impl Into<String>, entries: Vec<IndexEntry>) -> Self {
        Self {
            wl_hash: wl_hash.into(),
            entries,
            is_verified: false,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn avg_node_count(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: usize = self.entries.iter().map(|e| e.node_count).sum();
        total as f64 / self.entries.len() as f64
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn avg_line_count(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: usize = self.entries.iter().map(IndexEntry::line_count).sum();
        total as f64 / self.entries.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityKind {
    /// Same wl_hash and a compatible fingerprint.
    Exact,
}

impl SimilarityKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
        }
    }
}

/// A match returned by `find_similar`.
#[derive(Debug, Clone)]
pub struct SimilarityHit {
    pub entry: IndexEntry,
    pub similarity: SimilarityKind,
}

/// Serialized form: the bucket map with the WL iteration count pinned in
/// the header. Entries are rebuilt (graph, hash, fingerprint) on load, so
/// only the CodeUnit fields round-trip.
#[derive(Debug, Serialize, Deserialize)]
struct SavedIndex {
    wl_iterations: usize,
    buckets: HashMap<String, Vec<CodeUnit>>,
}

pub struct CodeIndex {
    wl_iterations: usize,
    extract_options: ExtractOptions,
    buckets: HashMap<String, Vec<IndexEntry>>,
}

impl CodeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            wl_iterations: 3,
            extract_options: ExtractOptions::default(),
            buckets: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        Self {
            wl_iterations: config.wl_iterations,
            extract_options: ExtractOptions {
                include_blocks: config.include_blocks,
                max_block_depth: config.max_block_depth,
            },
            buckets: HashMap::new(),
        }
    }

    #[must_use]
    pub fn wl_iterations(&self) -> usize {
        self.wl_iterations
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[must_use]
    pub fn bucket(&self, wl_hash: &str) -> &[IndexEntry] {
        self.buckets.get(wl_hash).map_or(&[], Vec::as_slice)
    }

    /// Builds the graph, hash, and fingerprint for `unit` and appends it to
    /// its bucket. Returns a copy of the stored entry.
    pub fn add_code_unit(&mut self, unit: CodeUnit) -> IndexEntry {
        let graph = code_unit_to_graph(&unit);
        let wl_hash = weisfeiler_leman_hash(&graph, self.wl_iterations);
        let fingerprint = structural_fingerprint(&graph);
        let node_count = graph.node_count();

        let entry = IndexEntry {
            code_unit: unit,
            graph,
            wl_hash: wl_hash.clone(),
            fingerprint,
            node_count,
        };
        self.buckets.entry(wl_hash).or_default().push(entry.clone());
        entry
    }

    /// Extracts and indexes every unit in `source`, pulling units from the
    /// lazy extractor and inserting each one before the next is read.
    /// Malformed source silently contributes nothing; the return value is
    /// the unit count.
    pub fn add_file(&mut self, file_path: &str, source: &str) -> usize {
        let options = self.extract_options.clone();
        let mut count = 0;
        for unit in extract_code_units(source, file_path, &options) {
            self.add_code_unit(unit);
            count += 1;
        }
        count
    }

    /// Drops every entry previously indexed from `file_path`; used when a
    /// file is re-indexed or deleted.
    pub fn remove_file(&mut self, file_path: &str) {
        for entries in self.buckets.values_mut() {
            entries.retain(|e| e.code_unit.file_path != file_path);
        }
        self.buckets.retain(|_, entries| !entries.is_empty());
    }

    /// Every bucket with at least two entries whose average node count
    /// meets `min_node_count`. Groups come back ordered by descending
    /// average node count; entries inside a group by (file_path,
    /// line_start). All groups start unverified.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn find_all_duplicates(&self, min_node_count: usize) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = self
            .buckets
            .iter()
            .filter(|(_, entries)| entries.len() >= 2)
            .map(|(hash, entries)| {
                let mut entries = entries.clone();
                entries.sort_by(|a, b| {
                    (&a.code_unit.file_path, a.code_unit.line_start)
                        .cmp(&(&b.code_unit.file_path, b.code_unit.line_start))
                });
                DuplicateGroup::new(hash.clone(), entries)
            })
            .filter(|group| group.avg_node_count() >= min_node_count as f64)
            .collect();

        groups.sort_by(|a, b| {
            b.avg_node_count()
                .partial_cmp(&a.avg_node_count())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.wl_hash.cmp(&b.wl_hash))
        });
        groups
    }

    /// Entries structurally identical to `code`: same wl_hash, compatible
    /// fingerprint, and at least `min_node_count` nodes. Unparseable input
    /// yields no hits.
    #[must_use]
    pub fn find_similar(&self, code: &str, min_node_count: usize) -> Vec<SimilarityHit> {
        let query = source_to_graph(code);
        if query.is_empty() {
            return Vec::new();
        }
        let wl_hash = weisfeiler_leman_hash(&query, self.wl_iterations);
        let query_fp = structural_fingerprint(&query);

        self.bucket(&wl_hash)
            .iter()
            .filter(|entry| entry.node_count >= min_node_count)
            .filter(|entry| fingerprints_compatible(&query_fp, &entry.fingerprint))
            .map(|entry| SimilarityHit {
                entry: entry.clone(),
                similarity: SimilarityKind::Exact,
            })
            .collect()
    }

    /// Writes the bucket map as JSON.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let saved = SavedIndex {
            wl_iterations: self.wl_iterations,
            buckets: self
                .buckets
                .iter()
                .map(|(hash, entries)| {
                    (
                        hash.clone(),
                        entries.iter().map(|e| e.code_unit.clone()).collect(),
                    )
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&saved).map_err(|e| Error::CorruptState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| Error::persistence(path, e))
    }

    /// Loads a saved index, rebuilding every entry under `config`'s WL
    /// iteration count. Returns the index and the iteration count the file
    /// was written with so callers can report a mismatch.
    ///
    /// # Errors
    ///
    /// Returns a persistence error for unreadable files and a corrupt-state
    /// error for undecodable ones.
    pub fn load(path: &Path, config: &Config) -> Result<(Self, usize)> {
        let raw =
            std::fs::read_to_string(path).map_err(|e| Error::persistence(path, e))?;
        let saved: SavedIndex =
            serde_json::from_str(&raw).map_err(|e| Error::CorruptState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut index = Self::with_config(config);
        for units in saved.buckets.into_values() {
            for unit in units {
                index.add_code_unit(unit);
            }
        }
        Ok((index, saved.wl_iterations))
    }
}

impl Default for CodeIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact isomorphism verification of two indexed entries within a time
/// budget. The fingerprint check runs first to settle incompatible pairs
/// without touching VF2.
#[must_use]
pub fn verify_entries(a: &IndexEntry, b: &IndexEntry, budget: Duration) -> Verdict {
    if !fingerprints_compatible(&a.fingerprint, &b.fingerprint) {
        return Verdict::NotIsomorphic;
    }
    are_isomorphic(&a.graph, &b.graph, budget)
}
