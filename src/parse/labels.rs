// src/parse/labels.rs
//! The label alphabet.
//!
//! Maps tree-sitter-python CST nodes onto the abstract-syntax labels the
//! hasher consumes. Node kinds use Python-AST-style names (FunctionDef,
//! Return, Call, Name); operator-carrying nodes compose `<Kind>:<symbol>`
//! (BinOp:+, Compare:<=, UnaryOp:not, BoolOp:and, AugAssign:*=); literals
//! become `Const:<type>` for type in {int, float, str, bytes, bool, none,
//! complex}. Identifier text never reaches a label, so renaming variables
//! cannot change a graph.

use tree_sitter::Node;

/// What the graph builder should do with one CST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Emit a node with this label and recurse into named children.
    Emit(String),
    /// Emit a leaf with this label; the subtree carries no more structure.
    Leaf(String),
    /// No node of its own; children attach to the current parent.
    Transparent,
    /// Drop the node and its subtree entirely.
    Skip,
}

/// Classifies a CST node into a build step.
#[must_use]
pub fn step_for(node: Node, source: &[u8]) -> Step {
    match node.kind() {
        "module" => Step::Emit("Module".to_string()),
        "comment" => Step::Skip,

        // Definitions
        "function_definition" => {
            if has_async_marker(node) {
                Step::Emit("AsyncFunctionDef".to_string())
            } else {
                Step::Emit("FunctionDef".to_string())
            }
        }
        "class_definition" => Step::Emit("ClassDef".to_string()),
        "decorated_definition" | "decorator" => Step::Transparent,
        "parameters" | "lambda_parameters" => Step::Emit("arguments".to_string()),
        "default_parameter" | "typed_parameter" | "typed_default_parameter" => Step::Transparent,

        // Statements
        "block" => Step::Transparent,
        "expression_statement" => expression_statement_step(node),
        "return_statement" => Step::Emit("Return".to_string()),
        "pass_statement" => Step::Leaf("Pass".to_string()),
        "break_statement" => Step::Leaf("Break".to_string()),
        "continue_statement" => Step::Leaf("Continue".to_string()),
        "if_statement" | "elif_clause" => Step::Emit("If".to_string()),
        "else_clause" | "finally_clause" => Step::Transparent,
        "for_statement" => {
            if has_async_marker(node) {
                Step::Emit("AsyncFor".to_string())
            } else {
                Step::Emit("For".to_string())
            }
        }
        "while_statement" => Step::Emit("While".to_string()),
        "try_statement" => Step::Emit("Try".to_string()),
        "except_clause" => Step::Emit("ExceptHandler".to_string()),
        "with_statement" => {
            if has_async_marker(node) {
                Step::Emit("AsyncWith".to_string())
            } else {
                Step::Emit("With".to_string())
            }
        }
        "with_clause" => Step::Transparent,
        "with_item" => Step::Emit("withitem".to_string()),
        "raise_statement" => Step::Emit("Raise".to_string()),
        "assert_statement" => Step::Emit("Assert".to_string()),
        "delete_statement" => Step::Emit("Delete".to_string()),
        "global_statement" => Step::Emit("Global".to_string()),
        "nonlocal_statement" => Step::Emit("Nonlocal".to_string()),
        "import_statement" => Step::Emit("Import".to_string()),
        "import_from_statement" | "future_import_statement" => {
            Step::Emit("ImportFrom".to_string())
        }
        "aliased_import" => Step::Emit("alias".to_string()),
        "dotted_name" | "relative_import" => Step::Transparent,

        // Assignments and operators
        "assignment" => {
            if node.child_by_field_name("type").is_some() {
                Step::Emit("AnnAssign".to_string())
            } else {
                Step::Emit("Assign".to_string())
            }
        }
        "augmented_assignment" => Step::Emit(operator_label(node, source, "AugAssign")),
        "named_expression" => Step::Emit("NamedExpr".to_string()),
        "binary_operator" => Step::Emit(operator_label(node, source, "BinOp")),
        "boolean_operator" => Step::Emit(operator_label(node, source, "BoolOp")),
        "unary_operator" => Step::Emit(operator_label(node, source, "UnaryOp")),
        "not_operator" => Step::Emit("UnaryOp:not".to_string()),
        "comparison_operator" => Step::Emit(comparison_label(node, source)),

        // Expressions
        "lambda" => Step::Emit("Lambda".to_string()),
        "conditional_expression" => Step::Emit("IfExp".to_string()),
        "call" => Step::Emit("Call".to_string()),
        "argument_list" => Step::Transparent,
        "keyword_argument" => Step::Emit("keyword".to_string()),
        "attribute" => Step::Emit("Attribute".to_string()),
        "subscript" => Step::Emit("Subscript".to_string()),
        "slice" => Step::Emit("Slice".to_string()),
        "identifier" => Step::Leaf("Name".to_string()),
        "await" => Step::Emit("Await".to_string()),
        "yield" => Step::Emit("Yield".to_string()),
        "list" => Step::Emit("List".to_string()),
        "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => {
            Step::Emit("Tuple".to_string())
        }
        "list_pattern" => Step::Emit("List".to_string()),
        "set" => Step::Emit("Set".to_string()),
        "dictionary" => Step::Emit("Dict".to_string()),
        "pair" => Step::Transparent,
        "list_comprehension" => Step::Emit("ListComp".to_string()),
        "set_comprehension" => Step::Emit("SetComp".to_string()),
        "dictionary_comprehension" => Step::Emit("DictComp".to_string()),
        "generator_expression" => Step::Emit("GeneratorExp".to_string()),
        "for_in_clause" => Step::Emit("comprehension".to_string()),
        "if_clause" | "parenthesized_expression" | "as_pattern" | "as_pattern_target"
        | "type" => Step::Transparent,
        "list_splat" | "list_splat_pattern" | "dictionary_splat"
        | "dictionary_splat_pattern" => Step::Emit("Starred".to_string()),
        "interpolation" => Step::Emit("FormattedValue".to_string()),
        "format_spec" | "format_expression" | "escape_sequence" | "string_start"
        | "string_content" | "string_end" => Step::Skip,

        // Literals
        "integer" => Step::Leaf(numeric_const_label(node, source, "int")),
        "float" => Step::Leaf(numeric_const_label(node, source, "float")),
        "string" => string_step(node, source),
        "concatenated_string" => concatenated_string_step(node, source),
        "true" | "false" => Step::Leaf("Const:bool".to_string()),
        "none" => Step::Leaf("Const:none".to_string()),
        "ellipsis" => Step::Leaf("Const:ellipsis".to_string()),

        "ERROR" => Step::Skip,

        other => Step::Emit(pascal_case(other)),
    }
}

/// `x = 1` nests an `assignment` under `expression_statement`; Python's AST
/// makes Assign a statement directly, so the wrapper is transparent there.
/// Genuine expression statements (calls, docstrings, yields) keep `Expr`.
fn expression_statement_step(node: Node) -> Step {
    if node.named_child_count() == 1 {
        if let Some(child) = node.named_child(0) {
            if matches!(child.kind(), "assignment" | "augmented_assignment") {
                return Step::Transparent;
            }
        }
    }
    Step::Emit("Expr".to_string())
}

/// True when an `async` keyword token precedes the construct.
fn has_async_marker(node: Node) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|c| c.kind() == "async");
    result
}

fn operator_label(node: Node, source: &[u8], kind: &str) -> String {
    let symbol = node
        .child_by_field_name("operator")
        .and_then(|op| op.utf8_text(source).ok())
        .unwrap_or("?");
    format!("{kind}:{symbol}")
}

/// Comparison chains carry every operator in source order, joined with
/// commas; the single-operator case yields exactly `Compare:<symbol>`.
/// `not in` / `is not` may surface as separate tokens and are re-joined.
fn comparison_label(node: Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let mut symbols: Vec<String> = Vec::new();
    for op in node.children_by_field_name("operators", &mut cursor) {
        let text = op.utf8_text(source).unwrap_or("?");
        match (symbols.last().map(String::as_str), text) {
            (Some("not"), "in") => {
                symbols.pop();
                symbols.push("not in".to_string());
            }
            (Some("is"), "not") => {
                symbols.pop();
                symbols.push("is not".to_string());
            }
            _ => symbols.push(text.to_string()),
        }
    }
    if symbols.is_empty() {
        return "Compare:?".to_string();
    }
    format!("Compare:{}", symbols.join(","))
}

/// `1j` and `1.5j` are complex literals; everything else keeps its base type.
fn numeric_const_label(node: Node, source: &[u8], base: &str) -> String {
    let text = node.utf8_text(source).unwrap_or("");
    if text.ends_with('j') || text.ends_with('J') {
        "Const:complex".to_string()
    } else {
        format!("Const:{base}")
    }
}

fn string_step(node: Node, source: &[u8]) -> Step {
    let prefix = string_prefix(node, source);
    if prefix.contains('b') {
        Step::Leaf("Const:bytes".to_string())
    } else if prefix.contains('f') {
        // f-strings keep their interpolations as FormattedValue children.
        Step::Emit("JoinedStr".to_string())
    } else {
        Step::Leaf("Const:str".to_string())
    }
}

fn concatenated_string_step(node: Node, source: &[u8]) -> Step {
    let mut cursor = node.walk();
    let any_formatted = node
        .named_children(&mut cursor)
        .any(|c| c.kind() == "string" && string_prefix(c, source).contains('f'));
    if any_formatted {
        Step::Emit("JoinedStr".to_string())
    } else {
        Step::Leaf("Const:str".to_string())
    }
}

/// Lowercased prefix letters before the opening quote (`rb"..."` → "rb").
fn string_prefix(node: Node, source: &[u8]) -> String {
    let text = node.utf8_text(source).unwrap_or("");
    text.chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Fallback for grammar kinds without an explicit mapping: snake_case kind
/// names become PascalCase labels, deterministically.
fn pascal_case(kind: &str) -> String {
    kind.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
