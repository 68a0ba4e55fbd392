// crates/trustchain-store/src/graph.rs
//
// Trust graph: the authoritative copy of direct trust.
//
// Each entry T(i, j) is how much address `i` trusts address `j`, in [-1, 1].
// The inner map for a truster is created on its first outgoing edge.
// Sorted maps keep neighbor iteration (and therefore floating-point
// summation order in propagation) identical on every node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sparse adjacency map: truster -> (trustee -> value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustGraph {
    edges: BTreeMap<String, BTreeMap<String, f64>>,
}

impl TrustGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set T(from, to), creating `from`'s neighbor map if absent.
    ///
    /// Range checking is the caller's job; the graph stores what it is given.
    pub fn set_trust(&mut self, from: &str, to: &str, value: f64) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), value);
    }

    /// Get T(from, to), or `None` if no edge exists.
    pub fn get_trust(&self, from: &str, to: &str) -> Option<f64> {
        self.edges.get(from).and_then(|row| row.get(to)).copied()
    }

    /// All outgoing edges of `from`, in trustee order.
    pub fn outgoing(&self, from: &str) -> impl Iterator<Item = (&str, f64)> {
        self.edges
            .get(from)
            .into_iter()
            .flat_map(|row| row.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    /// Number of addresses with at least one outgoing edge.
    pub fn truster_count(&self) -> usize {
        self.edges.len()
    }
}
