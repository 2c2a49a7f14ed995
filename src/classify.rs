// src/classify.rs
//! Context-aware classification of duplicate groups.
//!
//! Separates idiomatic duplication (guard clauses, conditional dict
//! builds, test setup, delegate methods) from duplication worth
//! refactoring, and decides whether suppression should be suggested.

use crate::index::{DuplicateGroup, IndexEntry};
use crate::parse::UnitType;
use regex::Regex;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateCategory {
    IdiomaticGuard,
    IdiomaticDictBuild,
    TestSetup,
    DelegateMethod,
    Refactorable,
}

impl DuplicateCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::IdiomaticGuard => "idiomatic_guard",
            Self::IdiomaticDictBuild => "idiomatic_dict_build",
            Self::TestSetup => "test_setup",
            Self::DelegateMethod => "delegate_method",
            Self::Refactorable => "refactorable",
        }
    }

    /// True for every category except `Refactorable`.
    #[must_use]
    pub fn is_idiomatic(self) -> bool {
        self != Self::Refactorable
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub category: DuplicateCategory,
    pub suppress_suggestion: bool,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reason: String,
    pub recommendation: String,
}

/// Path-based test-file detection, shared with the recommendation engine.
#[must_use]
pub fn is_test_file(file_path: &str) -> bool {
    let lower = file_path.to_lowercase();
    let stem = Path::new(&lower)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    lower.contains("test_")
        || lower.contains("_test")
        || lower.contains("/tests/")
        || lower.contains("/test/")
        || lower.starts_with("tests/")
        || lower.starts_with("test/")
        || lower.contains("spec_")
        || lower.contains("_spec")
        || stem == "conftest"
}

pub struct PatternClassifier {
    single_line_guard: Regex,
    guard_header: Regex,
    guard_body: Regex,
    dict_assign: Regex,
    delegate_return: Regex,
}

impl PatternClassifier {
    /// The patterns are compile-time constants, so construction cannot
    /// fail at runtime.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        Self {
            single_line_guard: Regex::new(
                r"^if\s.+:\s*(return\b.*|continue|break)$",
            )
            .expect("static regex"),
            guard_header: Regex::new(r"^if\s.+:$").expect("static regex"),
            guard_body: Regex::new(r"^(return\b.*|continue|break)$").expect("static regex"),
            dict_assign: Regex::new(r#"[\w\.\)\]]+\[[^\]]+\]\s*="#).expect("static regex"),
            delegate_return: Regex::new(r"^return\s+self\.\w+\((.*)\)$").expect("static regex"),
        }
    }

    /// Classifies one duplicate group. First matching rule wins:
    /// empty group, all-test-files, guard clause, conditional dict build,
    /// delegate method, then refactorable.
    #[must_use]
    pub fn classify_group(&self, group: &DuplicateGroup) -> Classification {
        let Some(first) = group.entries.first() else {
            return Classification {
                category: DuplicateCategory::Refactorable,
                suppress_suggestion: false,
                confidence: 0.5,
                reason: "empty group".to_string(),
                recommendation: "No entries to act on.".to_string(),
            };
        };

        if group
            .entries
            .iter()
            .all(|e| is_test_file(&e.code_unit.file_path))
        {
            return Classification {
                category: DuplicateCategory::TestSetup,
                suppress_suggestion: true,
                confidence: 0.8,
                reason: "all instances live in test files".to_string(),
                recommendation:
                    "Likely intentional test setup; suppress, or extract a shared fixture if it keeps growing."
                        .to_string(),
            };
        }

        let text = normalize(&first.code_unit.code);
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

        if let Some(reason) = self.guard_reason(&lines) {
            return Classification {
                category: DuplicateCategory::IdiomaticGuard,
                suppress_suggestion: true,
                confidence: 0.9,
                reason,
                recommendation: "Idiomatic guard clause; suppress this hash rather than refactoring."
                    .to_string(),
            };
        }

        if self.is_dict_build(&lines) {
            return Classification {
                category: DuplicateCategory::IdiomaticDictBuild,
                suppress_suggestion: true,
                confidence: 0.85,
                reason: "conditional dict/attribute build".to_string(),
                recommendation: "Idiomatic conditional assignment; suppress this hash.".to_string(),
            };
        }

        if self.is_delegate_method(&first.code_unit.code, &group.entries) {
            return Classification {
                category: DuplicateCategory::DelegateMethod,
                suppress_suggestion: true,
                confidence: 0.8,
                reason: "thin delegate methods with different arguments".to_string(),
                recommendation: "Delegation is the point of these methods; suppress this hash."
                    .to_string(),
            };
        }

        Classification {
            category: DuplicateCategory::Refactorable,
            suppress_suggestion: false,
            confidence: 0.7,
            reason: "structurally identical non-idiomatic code".to_string(),
            recommendation:
                "Extract a shared implementation and call it from every duplicate site."
                    .to_string(),
        }
    }

    /// Guard clause forms: a walrus-assignment guard, or a 1-2 line `if`
    /// whose only body statement is return/continue/break.
    fn guard_reason(&self, lines: &[&str]) -> Option<String> {
        let first = lines.first().map(|l| l.trim())?;

        if first.starts_with("if ") && first.contains(":=") {
            return Some("walrus guard clause".to_string());
        }
        if lines.len() > 2 || !first.starts_with("if ") {
            return None;
        }

        let body = match lines.len() {
            1 => {
                if !self.single_line_guard.is_match(first) {
                    return None;
                }
                first.split(':').next_back().unwrap_or("").trim()
            }
            _ => {
                let second = lines[1].trim();
                if !self.guard_header.is_match(first) || !self.guard_body.is_match(second) {
                    return None;
                }
                second
            }
        };

        if body.starts_with("continue") {
            Some("loop skip guard".to_string())
        } else if body.starts_with("break") {
            Some("loop exit guard".to_string())
        } else {
            Some("early return guard".to_string())
        }
    }

    /// `if <cond>: <target>[<key>] = <expr>` or a setattr call, 1-2 lines.
    fn is_dict_build(&self, lines: &[&str]) -> bool {
        let Some(first) = lines.first().map(|l| l.trim()) else {
            return false;
        };
        if lines.len() > 2 || !first.starts_with("if ") {
            return false;
        }
        lines
            .iter()
            .any(|l| self.dict_assign.is_match(l) || l.contains("setattr("))
    }

    /// At least two method entries, each a single return delegating to
    /// another method of self, with the call arguments differing somewhere
    /// in the group. Identical calls everywhere are plain copy-paste
    /// duplication, not a delegation idiom.
    #[must_use]
    pub fn is_delegate_method(&self, code: &str, entries: &[IndexEntry]) -> bool {
        if entries.len() < 2 {
            return false;
        }
        if !entries
            .iter()
            .all(|e| e.code_unit.unit_type == UnitType::Method)
        {
            return false;
        }
        if self.delegating_call_args(code).is_none() {
            return false;
        }

        let mut args = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.delegating_call_args(&entry.code_unit.code) {
                Some(a) => args.push(a),
                None => return false,
            }
        }
        args.iter().any(|a| a != &args[0])
    }

    /// The argument-list text of the body's single `return self.<m>(...)`,
    /// or None when the body is anything else.
    fn delegating_call_args(&self, code: &str) -> Option<String> {
        let body: Vec<&str> = code
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter(|l| !l.starts_with("def ") && !l.starts_with("async def "))
            .filter(|l| !l.starts_with("\"\"\"") && !l.starts_with("'''"))
            .filter(|l| !l.starts_with('#'))
            .collect();
        if body.len() != 1 {
            return None;
        }
        let captures = self.delegate_return.captures(body[0])?;
        Some(captures.get(1).map_or("", |m| m.as_str()).to_string())
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_lowercase()
}
