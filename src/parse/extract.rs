// src/parse/extract.rs
//! Code-unit extraction.
//!
//! Walks a parsed module and emits a `CodeUnit` for every top-level
//! function, class, method, and (optionally) nested control-flow block.
//! Block names follow `parent.kind_N` where N is the 1-based ordinal of
//! that kind among siblings at the same nesting level, in document order.

use super::parse_module;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Function,
    Method,
    Class,
    Block,
}

impl UnitType {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Block => "block",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    For,
    While,
    If,
    Try,
    With,
    AsyncFor,
    AsyncWith,
}

impl BlockType {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::For => "for",
            Self::While => "while",
            Self::If => "if",
            Self::Try => "try",
            Self::With => "with",
            Self::AsyncFor => "async_for",
            Self::AsyncWith => "async_with",
        }
    }
}

/// A named, extractable region of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    pub name: String,
    pub code: String,
    pub file_path: String,
    /// 1-based, inclusive.
    pub line_start: usize,
    /// 1-based, inclusive; always >= line_start.
    pub line_end: usize,
    pub unit_type: UnitType,
    /// Enclosing class for methods, enclosing function for blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    /// 1 for blocks directly inside the function body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nesting_depth: Option<usize>,
    /// Immediately enclosing block, absent at nesting depth 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_block_name: Option<String>,
}

impl CodeUnit {
    #[must_use]
    pub fn function(
        name: impl Into<String>,
        code: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            file_path: file_path.into(),
            line_start,
            line_end,
            unit_type: UnitType::Function,
            parent_name: None,
            block_type: None,
            nesting_depth: None,
            parent_block_name: None,
        }
    }

    #[must_use]
    pub fn method(
        name: impl Into<String>,
        code: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            unit_type: UnitType::Method,
            parent_name: Some(parent.into()),
            ..Self::function(name, code, file_path, line_start, line_end)
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_end.saturating_sub(self.line_start) + 1
    }
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub include_blocks: bool,
    pub max_block_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_blocks: true,
            max_block_depth: 10,
        }
    }
}

/// Extracts every code unit from `source`, lazily and in document order.
/// The iterator walks one top-level statement per pull, so a large module
/// never materializes its full unit list. Unparseable source yields an
/// empty sequence.
#[must_use]
pub fn extract_code_units<'a>(
    source: &'a str,
    file_path: &'a str,
    options: &'a ExtractOptions,
) -> impl Iterator<Item = CodeUnit> + 'a {
    UnitIter {
        tree: parse_module(source),
        source,
        file_path,
        options,
        next_stmt: 0,
        buffer: VecDeque::new(),
    }
}

/// Lazy extraction state: the parsed tree, the index of the next top-level
/// statement to walk, and a buffer holding the units of the statement
/// currently being drained. Nodes are never held across `next` calls, so
/// the owned tree and the traversal state stay disentangled.
struct UnitIter<'a> {
    tree: Option<Tree>,
    source: &'a str,
    file_path: &'a str,
    options: &'a ExtractOptions,
    next_stmt: usize,
    buffer: VecDeque<CodeUnit>,
}

impl Iterator for UnitIter<'_> {
    type Item = CodeUnit;

    fn next(&mut self) -> Option<CodeUnit> {
        loop {
            if let Some(unit) = self.buffer.pop_front() {
                return Some(unit);
            }
            let tree = self.tree.as_ref()?;
            let stmt = tree.root_node().named_child(self.next_stmt)?;
            self.next_stmt += 1;

            let mut extractor = Extractor {
                source: self.source,
                bytes: self.source.as_bytes(),
                file_path: self.file_path,
                options: self.options,
                units: Vec::new(),
            };
            extractor.dispatch_stmt(stmt, None);
            self.buffer.extend(extractor.units);
        }
    }
}

struct Extractor<'a> {
    source: &'a str,
    bytes: &'a [u8],
    file_path: &'a str,
    options: &'a ExtractOptions,
    units: Vec<CodeUnit>,
}

type KindCounters = HashMap<&'static str, usize>;

impl Extractor<'_> {
    /// `class_name` is set only for statements directly inside a class body.
    fn dispatch_stmt(&mut self, node: Node, class_name: Option<&str>) {
        match node.kind() {
            "decorated_definition" => {
                if let Some(def) = node.child_by_field_name("definition") {
                    self.dispatch_stmt(def, class_name);
                }
            }
            "function_definition" => self.extract_function(node, class_name),
            "class_definition" => self.extract_class(node),
            _ => self.scan_for_defs(node),
        }
    }

    /// Finds definitions buried inside non-definition statements
    /// (conditional defs, `if __name__` guards) without emitting blocks.
    fn scan_for_defs(&mut self, node: Node) {
        for child in named_children(node) {
            match child.kind() {
                "function_definition" | "class_definition" | "decorated_definition" => {
                    self.dispatch_stmt(child, None);
                }
                _ => self.scan_for_defs(child),
            }
        }
    }

    fn extract_function(&mut self, node: Node, class_name: Option<&str>) {
        let Some(name) = self.field_name(node) else {
            return;
        };
        let unit_type = if class_name.is_some() {
            UnitType::Method
        } else {
            UnitType::Function
        };
        self.units.push(CodeUnit {
            name: name.clone(),
            code: self.node_code(node),
            file_path: self.file_path.to_string(),
            line_start: node.start_position().row + 1,
            line_end: node.end_position().row + 1,
            unit_type,
            parent_name: class_name.map(str::to_string),
            block_type: None,
            nesting_depth: None,
            parent_block_name: None,
        });

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        if self.options.include_blocks {
            let mut counters = KindCounters::new();
            self.walk_body(body, &name, &name, 1, &mut counters);
        } else {
            self.scan_for_defs(body);
        }
    }

    fn extract_class(&mut self, node: Node) {
        let Some(name) = self.field_name(node) else {
            return;
        };
        self.units.push(CodeUnit {
            name: name.clone(),
            code: self.node_code(node),
            file_path: self.file_path.to_string(),
            line_start: node.start_position().row + 1,
            line_end: node.end_position().row + 1,
            unit_type: UnitType::Class,
            parent_name: None,
            block_type: None,
            nesting_depth: None,
            parent_block_name: None,
        });

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        for stmt in named_children(body) {
            self.dispatch_stmt(stmt, Some(&name));
        }
    }

    /// Walks the statements of one container (a function body or the suite
    /// of a block) at `depth`. `owner` is the dotted name prefix for new
    /// blocks at this level; `counters` holds per-kind ordinals for the
    /// level, shared across the container's clauses (else/except/finally).
    fn walk_body(
        &mut self,
        container: Node,
        func_name: &str,
        owner: &str,
        depth: usize,
        counters: &mut KindCounters,
    ) {
        for stmt in named_children(container) {
            match stmt.kind() {
                "for_statement" => {
                    let kind = if has_async(stmt) {
                        BlockType::AsyncFor
                    } else {
                        BlockType::For
                    };
                    self.handle_loop(stmt, kind, func_name, owner, depth, counters);
                }
                "while_statement" => {
                    self.handle_loop(stmt, BlockType::While, func_name, owner, depth, counters);
                }
                "with_statement" => {
                    let kind = if has_async(stmt) {
                        BlockType::AsyncWith
                    } else {
                        BlockType::With
                    };
                    self.handle_with(stmt, kind, func_name, owner, depth, counters);
                }
                "try_statement" => {
                    self.handle_try(stmt, func_name, owner, depth, counters);
                }
                "if_statement" => {
                    self.handle_if_chain(stmt, func_name, owner, depth, counters);
                }
                "function_definition" | "class_definition" | "decorated_definition" => {
                    self.dispatch_stmt(stmt, None);
                }
                _ => self.scan_for_defs(stmt),
            }
        }
    }

    /// Emits a block unit, returning the new block's name, or None when the
    /// depth cutoff suppresses it (defs inside are still discovered).
    fn emit_block(
        &mut self,
        node: Node,
        kind: BlockType,
        func_name: &str,
        owner: &str,
        depth: usize,
        counters: &mut KindCounters,
        code: String,
    ) -> Option<String> {
        if depth > self.options.max_block_depth {
            self.scan_for_defs(node);
            return None;
        }
        let ordinal = counters.entry(kind.label()).or_insert(0);
        *ordinal += 1;
        let name = format!("{owner}.{}_{}", kind.label(), ordinal);

        self.units.push(CodeUnit {
            name: name.clone(),
            code,
            file_path: self.file_path.to_string(),
            line_start: node.start_position().row + 1,
            line_end: node.end_position().row + 1,
            unit_type: UnitType::Block,
            parent_name: Some(func_name.to_string()),
            block_type: Some(kind),
            nesting_depth: Some(depth),
            parent_block_name: if depth == 1 {
                None
            } else {
                Some(owner.to_string())
            },
        });
        Some(name)
    }

    /// for / while, including the loop's `else` clause in its own scope.
    fn handle_loop(
        &mut self,
        node: Node,
        kind: BlockType,
        func_name: &str,
        owner: &str,
        depth: usize,
        counters: &mut KindCounters,
    ) {
        let code = self.node_code(node);
        let Some(name) = self.emit_block(node, kind, func_name, owner, depth, counters, code)
        else {
            return;
        };
        let mut inner = KindCounters::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_body(body, func_name, &name, depth + 1, &mut inner);
        }
        if let Some(alt) = node.child_by_field_name("alternative") {
            if let Some(body) = alt.child_by_field_name("body") {
                self.walk_body(body, func_name, &name, depth + 1, &mut inner);
            }
        }
    }

    fn handle_with(
        &mut self,
        node: Node,
        kind: BlockType,
        func_name: &str,
        owner: &str,
        depth: usize,
        counters: &mut KindCounters,
    ) {
        let code = self.node_code(node);
        let Some(name) = self.emit_block(node, kind, func_name, owner, depth, counters, code)
        else {
            return;
        };
        if let Some(body) = node.child_by_field_name("body") {
            let mut inner = KindCounters::new();
            self.walk_body(body, func_name, &name, depth + 1, &mut inner);
        }
    }

    /// try / except / else / finally all share the try block's scope,
    /// mirroring how the AST hangs handlers and orelse off the Try node.
    fn handle_try(
        &mut self,
        node: Node,
        func_name: &str,
        owner: &str,
        depth: usize,
        counters: &mut KindCounters,
    ) {
        let code = self.node_code(node);
        let Some(name) =
            self.emit_block(node, BlockType::Try, func_name, owner, depth, counters, code)
        else {
            return;
        };
        let mut inner = KindCounters::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_body(body, func_name, &name, depth + 1, &mut inner);
        }
        for clause in named_children(node) {
            match clause.kind() {
                "except_clause" | "finally_clause" => {
                    if let Some(block) = last_block_child(clause) {
                        self.walk_body(block, func_name, &name, depth + 1, &mut inner);
                    }
                }
                "else_clause" => {
                    if let Some(body) = clause.child_by_field_name("body") {
                        self.walk_body(body, func_name, &name, depth + 1, &mut inner);
                    }
                }
                _ => {}
            }
        }
    }

    /// An `elif` nests one level under the preceding if/elif block, exactly
    /// as the AST nests If nodes in orelse; a trailing `else` body belongs
    /// to the deepest block of the chain.
    fn handle_if_chain(
        &mut self,
        node: Node,
        func_name: &str,
        owner: &str,
        depth: usize,
        counters: &mut KindCounters,
    ) {
        let code = self.node_code(node);
        let Some(name) =
            self.emit_block(node, BlockType::If, func_name, owner, depth, counters, code)
        else {
            return;
        };

        let mut cur_name = name;
        let mut cur_depth = depth;
        let mut cur_counters = KindCounters::new();

        if let Some(consequence) = node.child_by_field_name("consequence") {
            self.walk_body(consequence, func_name, &cur_name, cur_depth + 1, &mut cur_counters);
        }

        let mut cursor = node.walk();
        let alternatives: Vec<Node> =
            node.children_by_field_name("alternative", &mut cursor).collect();
        drop(cursor);

        for alt in alternatives {
            match alt.kind() {
                "elif_clause" => {
                    // Slices of an elif do not reparse standalone; rewrite
                    // the leading keyword so the unit's code stays valid.
                    let code = self.node_code(alt).replacen("elif", "if", 1);
                    let Some(child_name) = self.emit_block(
                        alt,
                        BlockType::If,
                        func_name,
                        &cur_name,
                        cur_depth + 1,
                        &mut cur_counters,
                        code,
                    ) else {
                        continue;
                    };
                    let mut child_counters = KindCounters::new();
                    if let Some(consequence) = alt.child_by_field_name("consequence") {
                        self.walk_body(
                            consequence,
                            func_name,
                            &child_name,
                            cur_depth + 2,
                            &mut child_counters,
                        );
                    }
                    cur_name = child_name;
                    cur_depth += 1;
                    cur_counters = child_counters;
                }
                "else_clause" => {
                    if let Some(body) = alt.child_by_field_name("body") {
                        self.walk_body(
                            body,
                            func_name,
                            &cur_name,
                            cur_depth + 1,
                            &mut cur_counters,
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn field_name(&self, node: Node) -> Option<String> {
        let name = node.child_by_field_name("name")?;
        Some(name.utf8_text(self.bytes).ok()?.to_string())
    }

    fn node_code(&self, node: Node) -> String {
        self.source
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
            .to_string()
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn last_block_child(node: Node) -> Option<Node> {
    named_children(node)
        .into_iter()
        .rev()
        .find(|c| c.kind() == "block")
}

fn has_async(node: Node) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|c| c.kind() == "async");
    result
}
