// src/recommend.rs
//! Evidence-based refactoring recommendations.
//!
//! Converts duplicate groups into scored, classified suggestions. Every
//! output is framed as a suggestion with supporting evidence; the consumer
//! decides whether to act.

use crate::classify::is_test_file;
use crate::index::{DuplicateGroup, IndexEntry};
use crate::parse::UnitType;
use std::collections::HashMap;
use std::path::Path;

/// Refactoring actions the engine can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    ExtractToUtility,
    ConsolidateInPlace,
    ExtractToBaseClass,
    ReviewTestDuplication,
    NoAction,
}

impl ActionType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ExtractToUtility => "extract_to_utility",
            Self::ConsolidateInPlace => "consolidate_in_place",
            Self::ExtractToBaseClass => "extract_to_base_class",
            Self::ReviewTestDuplication => "review_test_duplication",
            Self::NoAction => "no_action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
    Trivial,
}

impl ImpactLevel {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Trivial => "trivial",
        }
    }

    #[must_use]
    fn from_score(score: f64) -> Self {
        if score >= 0.70 {
            Self::High
        } else if score >= 0.45 {
            Self::Medium
        } else if score >= 0.25 {
            Self::Low
        } else {
            Self::Trivial
        }
    }
}

/// A piece of evidence supporting a recommendation.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub fact: String,
    /// e.g. "45 lines", "3 occurrences"
    pub metric: Option<String>,
}

impl Evidence {
    fn new(fact: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            fact: fact.into(),
            metric: Some(metric.into()),
        }
    }

    fn bare(fact: impl Into<String>) -> Self {
        Self {
            fact: fact.into(),
            metric: None,
        }
    }
}

/// Information about one code location in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub file_path: String,
    pub name: String,
    /// "start-end"
    pub lines: String,
    pub unit_type: UnitType,
    pub parent_name: Option<String>,
    pub is_test_file: bool,
    /// Count of path segments; fewer means shallower.
    pub directory_depth: usize,
}

impl LocationInfo {
    fn from_entry(entry: &IndexEntry) -> Self {
        let unit = &entry.code_unit;
        Self {
            file_path: unit.file_path.clone(),
            name: unit.name.clone(),
            lines: format!("{}-{}", unit.line_start, unit.line_end),
            unit_type: unit.unit_type,
            parent_name: unit.parent_name.clone(),
            is_test_file: is_test_file(&unit.file_path),
            directory_depth: Path::new(&unit.file_path).components().count(),
        }
    }
}

/// A scored refactoring recommendation.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub action: ActionType,
    pub summary: String,
    pub rationale: String,
    pub impact: ImpactLevel,
    /// 0.0 - 1.0
    pub impact_score: f64,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub evidence: Vec<Evidence>,
    pub locations: Vec<LocationInfo>,
    pub keep_location: Option<LocationInfo>,
    pub keep_reason: Option<String>,
    pub remove_locations: Vec<LocationInfo>,
    /// Derived from common tokens in the existing names.
    pub suggested_name: Option<String>,
    pub lines_duplicated: usize,
    pub estimated_lines_saved: usize,
    pub files_affected: usize,
}

/// Callback used to verify a representative pair of a group.
pub type VerifyFn<'a> = dyn Fn(&IndexEntry, &IndexEntry) -> bool + 'a;

#[derive(Debug, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Analyzes duplicate groups into recommendations sorted by impact
    /// score descending. Groups with fewer than two entries are skipped.
    #[must_use]
    pub fn analyze_duplicates(
        &self,
        groups: &[DuplicateGroup],
        verify: Option<&VerifyFn>,
    ) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = groups
            .iter()
            .filter(|group| group.entries.len() >= 2)
            .map(|group| self.analyze_group(group, verify))
            .filter(|rec| rec.action != ActionType::NoAction)
            .collect();

        recommendations.sort_by(|a, b| {
            b.impact_score
                .partial_cmp(&a.impact_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations
    }

    #[allow(clippy::cast_precision_loss)]
    fn analyze_group(&self, group: &DuplicateGroup, verify: Option<&VerifyFn>) -> Recommendation {
        let entries = &group.entries;
        let locations: Vec<LocationInfo> = entries.iter().map(LocationInfo::from_entry).collect();

        let mut is_verified = group.is_verified;
        if !is_verified {
            if let Some(verify) = verify {
                is_verified = verify(&entries[0], &entries[1]);
            }
        }

        let total_lines: usize = entries.iter().map(IndexEntry::line_count).sum();
        let avg_lines = total_lines / entries.len();
        let avg_nodes: usize =
            entries.iter().map(|e| e.node_count).sum::<usize>() / entries.len();

        let mut evidence = vec![
            Evidence::new(
                format!(
                    "{} structurally identical code units detected",
                    entries.len()
                ),
                format!("{} occurrences", entries.len()),
            ),
            Evidence::new(
                format!("Each instance contains approximately {avg_lines} lines"),
                format!("{avg_lines} lines each"),
            ),
            Evidence::new(
                format!("AST complexity: {avg_nodes} nodes per instance"),
                format!("{avg_nodes} AST nodes"),
            ),
        ];
        if is_verified {
            evidence.push(Evidence::bare(
                "Structural equivalence verified via VF2 graph isomorphism",
            ));
        } else {
            evidence.push(Evidence::bare(
                "Structural equivalence indicated by matching Weisfeiler-Leman hash",
            ));
        }

        let test_count = locations.iter().filter(|l| l.is_test_file).count();
        let prod_count = locations.len() - test_count;
        if test_count > 0 && prod_count > 0 {
            evidence.push(Evidence::new(
                "Duplication spans test and production code",
                format!("{prod_count} prod, {test_count} test"),
            ));
        } else if test_count > 0 {
            evidence.push(Evidence::new(
                "All instances are in test files",
                format!("{test_count} test files"),
            ));
        } else {
            evidence.push(Evidence::new(
                "All instances are in production code",
                format!("{prod_count} production files"),
            ));
        }

        let action = determine_action(&locations, entries);
        let impact_score = impact_score(entries, &locations);
        let confidence = confidence(entries, is_verified, &locations);
        let impact = ImpactLevel::from_score(impact_score);

        let (keep_location, keep_reason) = select_keep_location(&locations);
        let remove_locations = match &keep_location {
            Some(keep) => locations.iter().filter(|l| *l != keep).cloned().collect(),
            None => Vec::new(),
        };

        let suggested_name = suggest_name(entries);
        let files_affected = {
            let unique: std::collections::HashSet<&str> =
                locations.iter().map(|l| l.file_path.as_str()).collect();
            unique.len()
        };
        let (summary, rationale) =
            describe(action, entries.len(), avg_lines, files_affected);

        Recommendation {
            action,
            summary,
            rationale,
            impact,
            impact_score,
            confidence,
            evidence,
            locations,
            keep_location,
            keep_reason,
            remove_locations,
            suggested_name,
            lines_duplicated: total_lines,
            estimated_lines_saved: total_lines - avg_lines,
            files_affected,
        }
    }
}

fn determine_action(locations: &[LocationInfo], entries: &[IndexEntry]) -> ActionType {
    let prod_count = locations.iter().filter(|l| !l.is_test_file).count();

    // All in test files - duplication might be intentional isolation.
    if prod_count == 0 {
        return ActionType::ReviewTestDuplication;
    }

    // All methods across at least two known classes.
    if entries
        .iter()
        .all(|e| e.code_unit.unit_type == UnitType::Method)
    {
        let parents: std::collections::HashSet<&Option<String>> =
            entries.iter().map(|e| &e.code_unit.parent_name).collect();
        if parents.len() > 1 && parents.iter().all(|p| p.is_some()) {
            return ActionType::ExtractToBaseClass;
        }
    }

    let directories: std::collections::HashSet<&Path> = locations
        .iter()
        .map(|l| Path::new(&l.file_path).parent().unwrap_or_else(|| Path::new("")))
        .collect();
    if directories.len() == 1 {
        return ActionType::ConsolidateInPlace;
    }

    ActionType::ExtractToUtility
}

/// Sum of frequency, complexity, production-ratio, and length factors,
/// clamped to [0, 1].
#[allow(clippy::cast_precision_loss)]
fn impact_score(entries: &[IndexEntry], locations: &[LocationInfo]) -> f64 {
    let count = entries.len();
    let mut score = (0.1 + (count - 1) as f64 * 0.05).min(0.3);

    let avg_nodes =
        entries.iter().map(|e| e.node_count).sum::<usize>() as f64 / count as f64;
    score += threshold_score(avg_nodes, &[(50.0, 0.30), (20.0, 0.25), (10.0, 0.15)], 0.05);

    let prod_count = locations.iter().filter(|l| !l.is_test_file).count();
    score += prod_count as f64 / locations.len() as f64 * 0.25;

    let avg_lines =
        entries.iter().map(IndexEntry::line_count).sum::<usize>() as f64 / count as f64;
    score += threshold_score(avg_lines, &[(30.0, 0.15), (15.0, 0.10), (5.0, 0.05)], 0.0);

    score.min(1.0)
}

/// Base 0.5, plus verification, complexity, and production bonuses.
#[allow(clippy::cast_precision_loss)]
fn confidence(entries: &[IndexEntry], is_verified: bool, locations: &[LocationInfo]) -> f64 {
    let mut score: f64 = 0.5;
    score += if is_verified { 0.25 } else { 0.10 };

    let avg_nodes =
        entries.iter().map(|e| e.node_count).sum::<usize>() as f64 / entries.len() as f64;
    if avg_nodes >= 15.0 {
        score += 0.15;
    } else if avg_nodes >= 8.0 {
        score += 0.10;
    }

    let prod_count = locations.iter().filter(|l| !l.is_test_file).count();
    if prod_count == locations.len() {
        score += 0.10;
    } else if prod_count > 0 {
        score += 0.05;
    }

    score.min(1.0)
}

/// Thresholds checked high to low.
fn threshold_score(value: f64, thresholds: &[(f64, f64)], default: f64) -> f64 {
    for &(threshold, score) in thresholds {
        if value >= threshold {
            return score;
        }
    }
    default
}

/// Proposes keeping the entry with the strictly smallest directory depth.
/// A tie at the minimum means no proposal.
fn select_keep_location(locations: &[LocationInfo]) -> (Option<LocationInfo>, Option<String>) {
    let Some(shallowest) = locations.iter().min_by_key(|l| l.directory_depth) else {
        return (None, None);
    };
    let at_minimum = locations
        .iter()
        .filter(|l| l.directory_depth == shallowest.directory_depth)
        .count();
    if at_minimum == 1 {
        (
            Some(shallowest.clone()),
            Some("shallowest path".to_string()),
        )
    } else {
        (None, None)
    }
}

/// Suggests a name from tokens shared by a majority of the entry names:
/// split on underscores and internal uppercase boundaries, lowercase, keep
/// tokens appearing in more than half the names, join up to three. Falls
/// back to the shortest existing name.
fn suggest_name(entries: &[IndexEntry]) -> Option<String> {
    let names: Vec<&str> = entries.iter().map(|e| e.code_unit.name.as_str()).collect();
    if names.is_empty() {
        return None;
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut order = 0usize;
    for name in &names {
        for token in tokenize(name) {
            *counts.entry(token.clone()).or_insert(0) += 1;
            first_seen.entry(token).or_insert_with(|| {
                order += 1;
                order
            });
        }
    }

    let threshold = names.len() / 2 + 1;
    let mut common: Vec<(&String, usize)> = counts
        .iter()
        .filter(|(_, &count)| count >= threshold)
        .map(|(token, &count)| (token, count))
        .collect();
    common.sort_by_key(|(token, count)| (std::cmp::Reverse(*count), first_seen[*token]));

    if !common.is_empty() {
        let joined: Vec<&str> = common.iter().take(3).map(|(t, _)| t.as_str()).collect();
        return Some(joined.join("_"));
    }

    names
        .iter()
        .enumerate()
        .min_by_key(|(idx, name)| (name.len(), *idx))
        .map(|(_, name)| (*name).to_string())
}

/// Splits on underscores and at internal uppercase boundaries, lowercasing.
fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in name.chars() {
        if ch == '_' {
            if !current.is_empty() {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            tokens.push(current.to_lowercase());
            current = ch.to_string();
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current.to_lowercase());
    }
    tokens
}

fn describe(
    action: ActionType,
    count: usize,
    avg_lines: usize,
    files_affected: usize,
) -> (String, String) {
    match action {
        ActionType::ExtractToUtility => (
            format!("Consider extracting {count} duplicate implementations to a shared utility"),
            format!(
                "Found {count} structurally identical code blocks (~{avg_lines} lines each) \
                 across {files_affected} files. Extracting to a shared utility would reduce \
                 maintenance burden and ensure consistent behavior."
            ),
        ),
        ActionType::ConsolidateInPlace => (
            format!("Consider consolidating {count} duplicates within the same directory"),
            format!(
                "Found {count} identical implementations in the same directory. \
                 Consolidating into a single local function would improve maintainability."
            ),
        ),
        ActionType::ExtractToBaseClass => (
            format!("Consider extracting {count} duplicate methods to a base class"),
            format!(
                "Found {count} identical methods across different classes. A base class or \
                 mixin could eliminate this duplication while preserving the design."
            ),
        ),
        ActionType::ReviewTestDuplication => (
            format!("Review {count} similar test implementations"),
            format!(
                "Found {count} structurally identical code blocks in test files. This may be \
                 intentional (test isolation) or could benefit from shared fixtures. Review \
                 to determine if consolidation is appropriate."
            ),
        ),
        ActionType::NoAction => (
            "No action recommended".to_string(),
            "The detected similarity does not warrant refactoring.".to_string(),
        ),
    }
}

/// Two lines per recommendation, built for agent consumption.
#[must_use]
pub fn format_recommendations_report(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "No refactoring opportunities identified.".to_string();
    }

    let mut lines = Vec::new();
    for (i, rec) in recommendations.iter().enumerate() {
        let locs: Vec<String> = rec
            .locations
            .iter()
            .map(|l| format!("{}:{}", l.file_path, l.name))
            .collect();
        lines.push(format!("{}. {}: {}", i + 1, rec.action.label(), locs.join(", ")));

        if let (Some(keep), Some(reason)) = (&rec.keep_location, &rec.keep_reason) {
            lines.push(format!(
                "   -> Keep {}:{} ({})",
                keep.file_path, keep.name, reason
            ));
        }
    }
    lines.join("\n")
}
