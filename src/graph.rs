//! The undirected weighted link graph produced by the tracking stages.
//!
//! Nodes are object ids (stable arena indices), edges are accepted links
//! weighted by their realized cost. Keeping the structure index-based — an
//! adjacency vector plus a flat edge list — makes insertion under a single
//! lock cheap and iteration deterministic.

use crate::types::ObjectId;

/// One accepted link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkEdge {
    pub source: ObjectId,
    pub target: ObjectId,
    /// Realized linking cost, used as the edge weight.
    pub cost: f64,
}

/// Undirected weighted graph over the objects of one tracking run.
#[derive(Clone, Debug, Default)]
pub struct LinkGraph {
    /// `adjacency[id] = [(neighbor, cost), ...]` in insertion order.
    adjacency: Vec<Vec<(ObjectId, f64)>>,
    edges: Vec<LinkEdge>,
}

impl LinkGraph {
    /// A graph over `n_objects` isolated nodes.
    pub fn new(n_objects: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); n_objects],
            edges: Vec::new(),
        }
    }

    /// Number of nodes (linked or not).
    pub fn n_objects(&self) -> usize {
        self.adjacency.len()
    }

    /// Insert an undirected edge.
    pub fn add_edge(&mut self, source: ObjectId, target: ObjectId, cost: f64) {
        self.adjacency[source.index()].push((target, cost));
        self.adjacency[target.index()].push((source, cost));
        self.edges.push(LinkEdge {
            source,
            target,
            cost,
        });
    }

    /// All accepted links, in insertion order.
    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    /// Neighbors of an object with the connecting edge weights.
    pub fn neighbors(&self, id: ObjectId) -> &[(ObjectId, f64)] {
        &self.adjacency[id.index()]
    }

    /// Number of edges incident to an object.
    pub fn degree(&self, id: ObjectId) -> usize {
        self.adjacency[id.index()].len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
