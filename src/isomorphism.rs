// src/isomorphism.rs
//! Exact isomorphism verification.
//!
//! VF2-style backtracking search for a label-preserving, edge-direction-
//! preserving bijection between two AST graphs. Each call honors a
//! wall-clock budget; exceeding it yields `Verdict::Unknown` so callers can
//! keep the pair as an unverified hash-collision candidate.

use crate::graph::{AstGraph, NodeId};
use std::time::{Duration, Instant};

/// Outcome of a verification attempt. `Unknown` is distinguishable from a
/// negative result: the pair may still be isomorphic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Isomorphic,
    NotIsomorphic,
    Unknown,
}

impl Verdict {
    #[must_use]
    pub fn is_isomorphic(self) -> bool {
        self == Self::Isomorphic
    }
}

/// Decides whether `a` and `b` are isomorphic as labeled digraphs.
/// Inputs are never mutated.
#[must_use]
pub fn are_isomorphic(a: &AstGraph, b: &AstGraph, budget: Duration) -> Verdict {
    if a.is_empty() && b.is_empty() {
        return Verdict::Isomorphic;
    }
    if a.node_count() != b.node_count()
        || a.edge_count() != b.edge_count()
        || a.label_histogram() != b.label_histogram()
    {
        return Verdict::NotIsomorphic;
    }

    let mut matcher = Vf2::new(a, b, budget);
    match matcher.search(0) {
        Search::Found => Verdict::Isomorphic,
        Search::NotFound => Verdict::NotIsomorphic,
        Search::TimedOut => Verdict::Unknown,
    }
}

enum Search {
    Found,
    NotFound,
    TimedOut,
}

struct Vf2<'g> {
    a: &'g AstGraph,
    b: &'g AstGraph,
    /// b label id for each a label id, resolved once so the inner loop
    /// compares integers.
    label_map: Vec<Option<u32>>,
    a_in: Vec<Vec<NodeId>>,
    b_in: Vec<Vec<NodeId>>,
    /// a node → mapped b node.
    core_a: Vec<Option<NodeId>>,
    /// b node → mapped a node.
    core_b: Vec<Option<NodeId>>,
    deadline: Instant,
    steps: u32,
}

impl<'g> Vf2<'g> {
    fn new(a: &'g AstGraph, b: &'g AstGraph, budget: Duration) -> Self {
        let b_labels: std::collections::HashMap<&str, u32> = b
            .nodes()
            .map(|n| (b.label(n), b.label_id(n)))
            .collect();
        let max_label = a.nodes().map(|n| a.label_id(n)).max().unwrap_or(0) as usize;
        let mut label_map = vec![None; max_label + 1];
        for node in a.nodes() {
            let id = a.label_id(node) as usize;
            label_map[id] = b_labels.get(a.label(node)).copied();
        }

        Self {
            label_map,
            a_in: in_neighbors(a),
            b_in: in_neighbors(b),
            core_a: vec![None; a.node_count()],
            core_b: vec![None; b.node_count()],
            deadline: Instant::now() + budget,
            a,
            b,
            steps: 0,
        }
    }

    /// Maps a-nodes in id order. Pre-order numbering means a node's parent
    /// is always mapped first, which keeps the search near-linear on the
    /// tree-shaped graphs the parser produces.
    fn search(&mut self, depth: usize) -> Search {
        if depth == self.a.node_count() {
            return Search::Found;
        }
        self.steps = self.steps.wrapping_add(1);
        if self.steps & 0x3ff == 0 && Instant::now() > self.deadline {
            return Search::TimedOut;
        }

        let a_node = depth as NodeId;
        for b_node in self.b.nodes() {
            if self.core_b[b_node as usize].is_some() {
                continue;
            }
            if !self.feasible(a_node, b_node) {
                continue;
            }
            self.core_a[a_node as usize] = Some(b_node);
            self.core_b[b_node as usize] = Some(a_node);
            match self.search(depth + 1) {
                Search::Found => return Search::Found,
                Search::TimedOut => return Search::TimedOut,
                Search::NotFound => {
                    self.core_a[a_node as usize] = None;
                    self.core_b[b_node as usize] = None;
                }
            }
        }
        Search::NotFound
    }

    fn feasible(&self, a_node: NodeId, b_node: NodeId) -> bool {
        let wanted = self.label_map[self.a.label_id(a_node) as usize];
        if wanted != Some(self.b.label_id(b_node)) {
            return false;
        }
        if self.a.out_degree(a_node) != self.b.out_degree(b_node)
            || self.a.in_degree(a_node) != self.b.in_degree(b_node)
        {
            return false;
        }

        // Every already-mapped neighbor must correspond across the pair,
        // in both edge directions.
        for &succ in self.a.out_neighbors(a_node) {
            if let Some(mapped) = self.core_a[succ as usize] {
                if !self.b.out_neighbors(b_node).contains(&mapped) {
                    return false;
                }
            }
        }
        for &pred in &self.a_in[a_node as usize] {
            if let Some(mapped) = self.core_a[pred as usize] {
                if !self.b_in[b_node as usize].contains(&mapped) {
                    return false;
                }
            }
        }
        for &succ in self.b.out_neighbors(b_node) {
            if let Some(mapped) = self.core_b[succ as usize] {
                if !self.a.out_neighbors(a_node).contains(&mapped) {
                    return false;
                }
            }
        }
        for &pred in &self.b_in[b_node as usize] {
            if let Some(mapped) = self.core_b[pred as usize] {
                if !self.a_in[a_node as usize].contains(&mapped) {
                    return false;
                }
            }
        }
        true
    }
}

fn in_neighbors(graph: &AstGraph) -> Vec<Vec<NodeId>> {
    let mut incoming = vec![Vec::new(); graph.node_count()];
    for node in graph.nodes() {
        for &child in graph.out_neighbors(node) {
            incoming[child as usize].push(node);
        }
    }
    incoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn chain(labels: &[&str]) -> AstGraph {
        let mut b = GraphBuilder::new();
        let mut prev = None;
        for label in labels {
            let node = b.add_node(label);
            if let Some(p) = prev {
                b.add_edge(p, node);
            }
            prev = Some(node);
        }
        b.finish()
    }

    #[test]
    fn identical_chains_match() {
        let g1 = chain(&["A", "B", "C"]);
        let g2 = chain(&["A", "B", "C"]);
        assert_eq!(
            are_isomorphic(&g1, &g2, Duration::from_secs(1)),
            Verdict::Isomorphic
        );
    }

    #[test]
    fn label_mismatch_rejected() {
        let g1 = chain(&["A", "B", "C"]);
        let g2 = chain(&["A", "B", "D"]);
        assert_eq!(
            are_isomorphic(&g1, &g2, Duration::from_secs(1)),
            Verdict::NotIsomorphic
        );
    }

    #[test]
    fn direction_matters() {
        let mut b1 = GraphBuilder::new();
        let x = b1.add_node("A");
        let y = b1.add_node("A");
        b1.add_edge(x, y);
        let g1 = b1.finish();

        let mut b2 = GraphBuilder::new();
        let x = b2.add_node("A");
        let y = b2.add_node("A");
        b2.add_edge(y, x);
        let g2 = b2.finish();

        // Same undirected shape; both have one A->A edge, so isomorphic
        // under relabeling. Sanity-check the matcher accepts the swap.
        assert_eq!(
            are_isomorphic(&g1, &g2, Duration::from_secs(1)),
            Verdict::Isomorphic
        );
    }

    #[test]
    fn empty_graphs_are_isomorphic() {
        let g1 = GraphBuilder::new().finish();
        let g2 = GraphBuilder::new().finish();
        assert_eq!(
            are_isomorphic(&g1, &g2, Duration::from_secs(1)),
            Verdict::Isomorphic
        );
    }
}
