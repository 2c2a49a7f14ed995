// src/graph.rs
//! Labeled directed syntax graphs.
//!
//! One `AstGraph` per code unit: node labels interned to integer ids, edges
//! parent→child, plus the precomputed label histogram and depth the index
//! and hasher rely on. Stored as flat arrays so a graph owns no cycles.

use crate::parse::labels::{step_for, Step};
use crate::parse::{parse_module, CodeUnit};
use std::collections::{BTreeMap, HashMap};
use tree_sitter::Node;

pub type NodeId = u32;
pub type LabelId = u32;

/// Immutable labeled digraph with graph-local label interning.
#[derive(Debug, Clone)]
pub struct AstGraph {
    /// Node id → interned label id. Node ids are assigned in deterministic
    /// pre-order: a parent is numbered before its children, children in
    /// source order.
    labels: Vec<LabelId>,
    /// Interned label id → label text.
    names: Vec<String>,
    /// Node id → outgoing neighbor ids.
    out: Vec<Vec<NodeId>>,
    in_degree: Vec<u32>,
    /// Label id → occurrence count.
    label_counts: Vec<usize>,
    depth: usize,
}

impl AstGraph {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.out.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Longest root-to-node distance; 0 for empty or rootless graphs.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn label_id(&self, node: NodeId) -> LabelId {
        self.labels[node as usize]
    }

    #[must_use]
    pub fn label(&self, node: NodeId) -> &str {
        &self.names[self.labels[node as usize] as usize]
    }

    #[must_use]
    pub fn label_name(&self, label: LabelId) -> &str {
        &self.names[label as usize]
    }

    #[must_use]
    pub fn out_neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.out[node as usize]
    }

    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.out[node as usize].len()
    }

    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.in_degree[node as usize] as usize
    }

    /// Label text → occurrence count.
    #[must_use]
    pub fn label_histogram(&self) -> BTreeMap<&str, usize> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.as_str(), self.label_counts[id]))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        0..self.labels.len() as u32
    }
}

/// Incremental construction; `finish()` freezes derived data.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    labels: Vec<LabelId>,
    names: Vec<String>,
    by_name: HashMap<String, LabelId>,
    out: Vec<Vec<NodeId>>,
    in_degree: Vec<u32>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, label: &str) -> NodeId {
        debug_assert!(!label.is_empty(), "node labels must be non-empty");
        let label_id = match self.by_name.get(label) {
            Some(&id) => id,
            None => {
                let id = self.names.len() as LabelId;
                self.names.push(label.to_string());
                self.by_name.insert(label.to_string(), id);
                id
            }
        };
        let node = self.labels.len() as NodeId;
        self.labels.push(label_id);
        self.out.push(Vec::new());
        self.in_degree.push(0);
        node
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.out[from as usize].push(to);
        self.in_degree[to as usize] += 1;
    }

    #[must_use]
    pub fn finish(self) -> AstGraph {
        let mut label_counts = vec![0usize; self.names.len()];
        for &label in &self.labels {
            label_counts[label as usize] += 1;
        }
        let depth = compute_depth(&self.out, &self.in_degree);
        AstGraph {
            labels: self.labels,
            names: self.names,
            out: self.out,
            in_degree: self.in_degree,
            label_counts,
            depth,
        }
    }
}

/// BFS level count from in-degree-0 roots. Cycle-reachable nodes are never
/// enqueued, which bounds the walk on malformed hand-built graphs.
fn compute_depth(out: &[Vec<NodeId>], in_degree: &[u32]) -> usize {
    let mut depth = 0usize;
    let mut level: Vec<NodeId> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i as NodeId)
        .collect();
    let mut seen = vec![false; out.len()];
    for &n in &level {
        seen[n as usize] = true;
    }
    while !level.is_empty() {
        let mut next = Vec::new();
        for &node in &level {
            for &child in &out[node as usize] {
                if !seen[child as usize] {
                    seen[child as usize] = true;
                    next.push(child);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        depth += 1;
        level = next;
    }
    depth
}

/// Builds the AST graph for a code unit by parsing its text. Unparseable
/// or empty code yields an empty graph; downstream handles both shapes.
#[must_use]
pub fn code_unit_to_graph(unit: &CodeUnit) -> AstGraph {
    source_to_graph(&unit.code)
}

/// Parses `source` and converts the whole module subtree.
#[must_use]
pub fn source_to_graph(source: &str) -> AstGraph {
    let Some(tree) = parse_module(source) else {
        return GraphBuilder::new().finish();
    };
    let mut builder = GraphBuilder::new();
    convert(tree.root_node(), source.as_bytes(), None, &mut builder);
    builder.finish()
}

/// Pre-order conversion: emit the node (per its label step), then children
/// in source order. Transparent nodes splice their children into `parent`.
fn convert(node: Node, source: &[u8], parent: Option<NodeId>, builder: &mut GraphBuilder) {
    match step_for(node, source) {
        Step::Emit(label) => {
            let id = builder.add_node(&label);
            if let Some(p) = parent {
                builder.add_edge(p, id);
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            drop(cursor);
            for child in children {
                convert(child, source, Some(id), builder);
            }
        }
        Step::Leaf(label) => {
            let id = builder.add_node(&label);
            if let Some(p) = parent {
                builder.add_edge(p, id);
            }
        }
        Step::Transparent => {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            drop(cursor);
            for child in children {
                convert(child, source, parent, builder);
            }
        }
        Step::Skip => {}
    }
}
