// src/hash.rs
//! Canonical structural hashing.
//!
//! Weisfeiler-Leman (1-dimensional color refinement) over a labeled
//! digraph, plus the cheap structural fingerprint used to pre-filter
//! isomorphism candidates. Digests use SHA-256 so hashes are identical
//! across runs and platforms; two isomorphic label-identical graphs always
//! collide, and the converse is settled by the VF2 verifier.

use crate::graph::AstGraph;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Sentinel hash for the zero-node graph.
pub const EMPTY_HASH: &str = "empty";

/// Computes the WL hash of `graph` after `iterations` refinement rounds.
///
/// Iteration 0 colors each node with its label; each round replaces a
/// node's color with a digest of (own color, lexicographically sorted
/// colors of out-neighbors). The graph hash digests the sorted multiset of
/// final colors.
#[must_use]
pub fn weisfeiler_leman_hash(graph: &AstGraph, iterations: usize) -> String {
    if graph.is_empty() {
        return EMPTY_HASH.to_string();
    }

    let mut colors: Vec<String> = graph
        .nodes()
        .map(|n| graph.label(n).to_string())
        .collect();

    for _ in 0..iterations {
        let mut next = Vec::with_capacity(colors.len());
        for node in graph.nodes() {
            let mut neighbor_colors: Vec<&str> = graph
                .out_neighbors(node)
                .iter()
                .map(|&n| colors[n as usize].as_str())
                .collect();
            neighbor_colors.sort_unstable();

            let mut hasher = Sha256::new();
            hasher.update(colors[node as usize].as_bytes());
            hasher.update(b"(");
            for color in &neighbor_colors {
                hasher.update(color.as_bytes());
                hasher.update(b",");
            }
            hasher.update(b")");
            next.push(hex_digest(hasher));
        }
        colors = next;
    }

    colors.sort_unstable();
    let mut hasher = Sha256::new();
    for color in &colors {
        hasher.update(color.as_bytes());
        hasher.update(b"|");
    }
    hex_digest(hasher)
}

/// First 16 digest bytes as lowercase hex; fixed 32-character output.
fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Cheap structural summary: pairwise comparable in O(L + N) to rule out
/// isomorphism before running VF2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub n_nodes: usize,
    pub n_edges: usize,
    pub label_counts: BTreeMap<String, usize>,
    /// Sorted ascending.
    pub in_degree_seq: Vec<usize>,
    /// Sorted ascending.
    pub out_degree_seq: Vec<usize>,
    pub empty: bool,
}

#[must_use]
pub fn structural_fingerprint(graph: &AstGraph) -> Fingerprint {
    if graph.is_empty() {
        return Fingerprint {
            n_nodes: 0,
            n_edges: 0,
            label_counts: BTreeMap::new(),
            in_degree_seq: Vec::new(),
            out_degree_seq: Vec::new(),
            empty: true,
        };
    }

    let label_counts = graph
        .label_histogram()
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();

    let mut in_degree_seq: Vec<usize> = graph.nodes().map(|n| graph.in_degree(n)).collect();
    let mut out_degree_seq: Vec<usize> = graph.nodes().map(|n| graph.out_degree(n)).collect();
    in_degree_seq.sort_unstable();
    out_degree_seq.sort_unstable();

    Fingerprint {
        n_nodes: graph.node_count(),
        n_edges: graph.edge_count(),
        label_counts,
        in_degree_seq,
        out_degree_seq,
        empty: false,
    }
}

/// Necessary-but-not-sufficient isomorphism filter: two empties are
/// compatible; an empty and a non-empty never are; otherwise node and edge
/// counts, label counts, and both degree sequences must agree exactly.
#[must_use]
pub fn fingerprints_compatible(a: &Fingerprint, b: &Fingerprint) -> bool {
    if a.empty || b.empty {
        return a.empty && b.empty;
    }
    a.n_nodes == b.n_nodes
        && a.n_edges == b.n_edges
        && a.label_counts == b.label_counts
        && a.in_degree_seq == b.in_degree_seq
        && a.out_degree_seq == b.out_degree_seq
}
