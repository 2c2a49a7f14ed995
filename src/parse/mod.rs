// src/parse/mod.rs
//! Fault-tolerant Python parsing.
//!
//! The contract for everything downstream: syntactically invalid input
//! yields `None` (and therefore zero extracted units), never an error.

pub mod extract;
pub mod labels;

pub use extract::{extract_code_units, BlockType, CodeUnit, ExtractOptions, UnitType};

use crate::lang::Lang;
use tree_sitter::{Parser, Tree};

/// Parses Python source, returning `None` for anything the grammar cannot
/// fully accept. tree-sitter itself recovers from errors with ERROR nodes;
/// we reject those trees so extraction matches an all-or-nothing parser.
#[must_use]
pub fn parse_module(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(Lang::Python.grammar()).ok()?;
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_parses() {
        assert!(parse_module("def f():\n    return 1\n").is_some());
    }

    #[test]
    fn broken_source_yields_none() {
        assert!(parse_module("def f( broken").is_none());
    }

    #[test]
    fn empty_source_parses() {
        assert!(parse_module("").is_some());
    }
}
