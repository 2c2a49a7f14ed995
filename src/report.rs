// src/report.rs
//! Terminal rendering of analysis results.

use crate::classify::Classification;
use crate::index::DuplicateGroup;
use crate::recommend::Recommendation;
use colored::Colorize;
use std::fmt::Write;

/// One classified duplicate group, ready to render.
#[derive(Debug, Clone)]
pub struct Finding {
    pub group: DuplicateGroup,
    pub classification: Classification,
}

/// Everything an analyze pass produced.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Groups worth refactoring, most impactful first.
    pub refactorable: Vec<Finding>,
    /// Idiomatic groups (guards, dict builds, test setup, delegates).
    pub idiomatic: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    /// Groups hidden because their hash is suppressed.
    pub suppressed: usize,
}

impl Analysis {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refactorable.is_empty() && self.idiomatic.is_empty()
    }
}

/// Renders the full analysis for terminal or tool output.
#[must_use]
pub fn render_analysis(analysis: &Analysis) -> String {
    if analysis.is_empty() {
        let mut out = String::from("No significant duplicates found.");
        if analysis.suppressed > 0 {
            let _ = write!(out, " ({} suppressed group(s) hidden)", analysis.suppressed);
        }
        return out;
    }

    let mut out = String::new();

    if !analysis.refactorable.is_empty() {
        let _ = writeln!(
            out,
            "{} {}",
            "REFACTOR".red().bold(),
            format!("({} group(s))", analysis.refactorable.len()).dimmed()
        );
        for finding in &analysis.refactorable {
            write_group(&mut out, finding);
        }
        let _ = writeln!(out);
    }

    if !analysis.recommendations.is_empty() {
        let _ = writeln!(out, "{}", "RECOMMENDATIONS".cyan().bold());
        for (i, rec) in analysis.recommendations.iter().enumerate() {
            write_recommendation(&mut out, i + 1, rec);
        }
        let _ = writeln!(out);
    }

    if !analysis.idiomatic.is_empty() {
        let _ = writeln!(
            out,
            "{} {}",
            "IDIOMATIC".green().bold(),
            format!("({} group(s))", analysis.idiomatic.len()).dimmed()
        );
        for finding in &analysis.idiomatic {
            write_idiomatic(&mut out, finding);
        }
        let _ = writeln!(out);
    }

    if analysis.suppressed > 0 {
        let _ = writeln!(
            out,
            "{}",
            format!("{} suppressed group(s) hidden.", analysis.suppressed).dimmed()
        );
    }

    out
}

fn write_group(out: &mut String, finding: &Finding) {
    let group = &finding.group;
    let verified = if group.is_verified {
        "verified (VF2)".green().to_string()
    } else {
        "unverified (WL hash)".yellow().to_string()
    };
    let _ = writeln!(
        out,
        "  {} {} instances, ~{:.0} nodes, {}",
        format!("[{}]", short_hash(&group.wl_hash)).dimmed(),
        group.entries.len(),
        group.avg_node_count(),
        verified
    );
    for entry in &group.entries {
        let _ = writeln!(
            out,
            "    {}:{} {} (lines {}-{})",
            entry.code_unit.file_path,
            entry.code_unit.name,
            entry.code_unit.unit_type.label().dimmed(),
            entry.code_unit.line_start,
            entry.code_unit.line_end
        );
    }
}

fn write_recommendation(out: &mut String, ordinal: usize, rec: &Recommendation) {
    let _ = writeln!(
        out,
        "  {ordinal}. {} {} (impact {:.2}, confidence {:.2})",
        rec.action.label().bold(),
        rec.impact.label().to_uppercase(),
        rec.impact_score,
        rec.confidence
    );
    let _ = writeln!(out, "     {}", rec.summary);
    if let (Some(keep), Some(reason)) = (&rec.keep_location, &rec.keep_reason) {
        let _ = writeln!(
            out,
            "     keep {}:{} ({reason})",
            keep.file_path, keep.name
        );
    }
    if let Some(name) = &rec.suggested_name {
        let _ = writeln!(out, "     suggested name: {name}");
    }
    for evidence in &rec.evidence {
        match &evidence.metric {
            Some(metric) => {
                let _ = writeln!(out, "     - {} [{}]", evidence.fact, metric.dimmed());
            }
            None => {
                let _ = writeln!(out, "     - {}", evidence.fact);
            }
        }
    }
}

fn write_idiomatic(out: &mut String, finding: &Finding) {
    let group = &finding.group;
    let c = &finding.classification;
    let _ = writeln!(
        out,
        "  {} {} x{} - {}",
        format!("[{}]", short_hash(&group.wl_hash)).dimmed(),
        c.category.label().to_uppercase(),
        group.entries.len(),
        c.reason
    );
    let _ = writeln!(
        out,
        "    {} {}",
        c.recommendation.dimmed(),
        format!("(dupgraph suppress {})", group.wl_hash).dimmed()
    );
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
