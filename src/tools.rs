// src/tools.rs
//! The tool facade.
//!
//! `StructureTools` owns the index, the suppression set, the classifier and
//! the recommendation engine, and exposes the operations the CLI and the
//! framed server dispatch into. Suppression filtering happens here, never
//! in the index.

use crate::classify::PatternClassifier;
use crate::config::Config;
use crate::discovery;
use crate::error::Result;
use crate::index::{verify_entries, CodeIndex, DuplicateGroup, SuppressionSet};
use crate::isomorphism::Verdict;
use crate::parse::{extract_code_units, CodeUnit, ExtractOptions};
use crate::recommend::RecommendationEngine;
use crate::report::{self, Analysis, Finding};
use anyhow::Context;
use rayon::prelude::*;
use std::path::Path;

/// Duplicates smaller than this are only shown in thorough mode.
const THOROUGH_MIN_NODES: usize = 5;
const SIGNIFICANT_MIN_NODES: usize = 25;

/// Minimum graph size before the write/edit gate blocks on a match.
const GATE_MIN_NODES: usize = 5;

pub const INDEX_FILE: &str = "index.json";
pub const SUPPRESSIONS_FILE: &str = "suppressions.txt";

/// Result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub units_added: usize,
}

pub struct StructureTools {
    pub index: CodeIndex,
    pub suppressions: SuppressionSet,
    classifier: PatternClassifier,
    engine: RecommendationEngine,
    config: Config,
}

impl StructureTools {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            index: CodeIndex::with_config(&config),
            suppressions: SuppressionSet::new(),
            classifier: PatternClassifier::new(),
            engine: RecommendationEngine::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parses, extracts, and indexes every source file under `root`.
    /// Extraction runs in parallel; bucket insertion stays on this thread.
    pub fn index_codebase(&mut self, root: &Path) -> anyhow::Result<IndexStats> {
        let files = discovery::discover(root);
        let options = ExtractOptions {
            include_blocks: self.config.include_blocks,
            max_block_depth: self.config.max_block_depth,
        };

        let extracted: Vec<(String, Option<Vec<CodeUnit>>)> = files
            .par_iter()
            .map(|path| {
                let display = path.display().to_string();
                let Ok(source) = std::fs::read_to_string(path) else {
                    return (display, None);
                };
                if crate::parse::parse_module(&source).is_none() {
                    return (display, None);
                }
                let units: Vec<CodeUnit> =
                    extract_code_units(&source, &display, &options).collect();
                (display, Some(units))
            })
            .collect();

        let mut stats = IndexStats::default();
        for (path, units) in extracted {
            match units {
                Some(units) => {
                    stats.files_indexed += 1;
                    self.index.remove_file(&path);
                    stats.units_added += units.len();
                    for unit in units {
                        self.index.add_code_unit(unit);
                    }
                }
                None => stats.files_skipped += 1,
            }
        }

        if self.config.verbose {
            eprintln!(
                "indexed {} file(s), skipped {}, {} unit(s)",
                stats.files_indexed, stats.files_skipped, stats.units_added
            );
        }
        Ok(stats)
    }

    /// Re-indexes a single file in place (watcher and gate flows).
    pub fn reindex_file(&mut self, path: &Path) -> usize {
        let display = path.display().to_string();
        self.index.remove_file(&display);
        match std::fs::read_to_string(path) {
            Ok(source) => self.index.add_file(&display, &source),
            Err(_) => 0,
        }
    }

    /// Drops a deleted file's units.
    pub fn forget_file(&mut self, path: &Path) {
        self.index.remove_file(&path.display().to_string());
    }

    /// Finds duplicate groups, verifies a representative pair per group,
    /// classifies them, and renders the findings. `thorough` lowers the
    /// node-count threshold to include small duplicates.
    #[must_use]
    pub fn analyze(&self, thorough: bool) -> ToolResult {
        if self.index.is_empty() {
            return ToolResult::ok("No code indexed. Run the indexer first.");
        }

        let min_nodes = if thorough {
            THOROUGH_MIN_NODES
        } else {
            SIGNIFICANT_MIN_NODES
        };
        let groups = self.index.find_all_duplicates(min_nodes);

        let mut analysis = Analysis::default();
        let mut refactorable_groups: Vec<DuplicateGroup> = Vec::new();

        for mut group in groups {
            if self.suppressions.contains(&group.wl_hash) {
                analysis.suppressed += 1;
                continue;
            }
            group.is_verified = self.verify_group(&group);
            let classification = self.classifier.classify_group(&group);
            let finding = Finding {
                group: group.clone(),
                classification,
            };
            if finding.classification.category.is_idiomatic() {
                analysis.idiomatic.push(finding);
            } else {
                refactorable_groups.push(group);
                analysis.refactorable.push(finding);
            }
        }

        analysis.recommendations = self.engine.analyze_duplicates(&refactorable_groups, None);
        ToolResult::ok(report::render_analysis(&analysis))
    }

    /// One isomorphism check per group promotes it to verified; a timeout
    /// leaves it an unverified hash-collision candidate.
    fn verify_group(&self, group: &DuplicateGroup) -> bool {
        if group.is_verified {
            return true;
        }
        let (Some(a), Some(b)) = (group.entries.first(), group.entries.get(1)) else {
            return false;
        };
        verify_entries(a, b, self.config.verify_budget) == Verdict::Isomorphic
    }

    /// Duplicate gate for write/edit flows: an exact structural match
    /// outside `file_path` blocks the operation.
    #[must_use]
    pub fn check_code(&self, file_path: &str, content: &str) -> ToolResult {
        let hits = self.index.find_similar(content, GATE_MIN_NODES);
        let conflicts: Vec<_> = hits
            .iter()
            .filter(|hit| hit.entry.code_unit.file_path != file_path)
            .collect();

        if conflicts.is_empty() {
            return ToolResult::ok("OK: no structural duplicates of this code are indexed.");
        }

        let mut text = String::from("BLOCKED: structurally identical code already exists:\n");
        for hit in conflicts {
            let unit = &hit.entry.code_unit;
            text.push_str(&format!(
                "  {}:{} (lines {}-{}, {})\n",
                unit.file_path,
                unit.name,
                unit.line_start,
                unit.line_end,
                hit.similarity.label()
            ));
        }
        text.push_str("Reuse the existing implementation or suppress its hash.");
        ToolResult::error(text)
    }

    pub fn suppress(&mut self, wl_hash: &str) -> ToolResult {
        if self.suppressions.add(wl_hash) {
            ToolResult::ok(format!("Suppressed {wl_hash}."))
        } else {
            ToolResult::ok(format!("{wl_hash} was already suppressed."))
        }
    }

    pub fn unsuppress(&mut self, wl_hash: &str) -> ToolResult {
        if self.suppressions.remove(wl_hash) {
            ToolResult::ok(format!("Unsuppressed {wl_hash}."))
        } else {
            ToolResult::ok(format!("{wl_hash} was not suppressed."))
        }
    }

    #[must_use]
    pub fn list_suppressions(&self) -> ToolResult {
        if self.suppressions.is_empty() {
            return ToolResult::ok("No suppressed hashes.");
        }
        ToolResult::ok(self.suppressions.list().join("\n"))
    }

    /// Suppresses every currently-idiomatic duplicate group in one call.
    pub fn suppress_idiomatic(&mut self) -> ToolResult {
        let groups = self.index.find_all_duplicates(1);
        let mut added = 0usize;
        for group in groups {
            let classification = self.classifier.classify_group(&group);
            if classification.suppress_suggestion && self.suppressions.add(&group.wl_hash) {
                added += 1;
            }
        }
        ToolResult::ok(format!("Suppressed {added} idiomatic group(s)."))
    }

    /// String-keyed dispatch used by the framed server.
    pub fn call_tool(&mut self, name: &str, args: &serde_json::Value) -> ToolResult {
        match name {
            "analyze" => {
                let thorough = args
                    .get("thorough")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(true);
                self.analyze(thorough)
            }
            "check_code" => {
                let (Some(file_path), Some(content)) = (
                    args.get("file_path").and_then(serde_json::Value::as_str),
                    args.get("content").and_then(serde_json::Value::as_str),
                ) else {
                    return ToolResult::error("check_code requires file_path and content");
                };
                self.check_code(file_path, content)
            }
            "suppress" | "unsuppress" => {
                let Some(wl_hash) = args.get("wl_hash").and_then(serde_json::Value::as_str)
                else {
                    return ToolResult::error(format!("{name} requires wl_hash"));
                };
                if name == "suppress" {
                    self.suppress(wl_hash)
                } else {
                    self.unsuppress(wl_hash)
                }
            }
            "list_suppressions" => self.list_suppressions(),
            "suppress_idiomatic" => self.suppress_idiomatic(),
            other => ToolResult::error(format!("Unknown tool: {other}")),
        }
    }

    /// Persists the index and suppression set under `dir`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when `dir` cannot be created or written.
    pub fn save_state(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .map_err(|e| crate::error::Error::persistence(dir, e))?;
        self.index.save(&dir.join(INDEX_FILE))?;
        self.suppressions.save(&dir.join(SUPPRESSIONS_FILE))?;
        Ok(())
    }

    /// Restores persisted state. Missing files leave the fresh defaults.
    pub fn load_state(&mut self, dir: &Path) -> anyhow::Result<()> {
        let index_path = dir.join(INDEX_FILE);
        if index_path.exists() {
            let (index, saved_iterations) = CodeIndex::load(&index_path, &self.config)
                .context("loading persisted index")?;
            if saved_iterations != self.config.wl_iterations && self.config.verbose {
                eprintln!(
                    "index was written with wl_iterations={saved_iterations}, rebuilt with {}",
                    self.config.wl_iterations
                );
            }
            self.index = index;
        }
        self.suppressions =
            SuppressionSet::load(&dir.join(SUPPRESSIONS_FILE)).context("loading suppressions")?;
        Ok(())
    }
}
