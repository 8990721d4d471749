//! Track-segment decomposition: split the link graph into connected
//! components and classify each component's objects as segment start,
//! segment end, or segment middle.
//!
//! Components are found with union-find (path halving + union by rank).
//! A component of fewer than two objects is an isolated detection, not a
//! segment, and is skipped. Segments are recomputed from scratch every time
//! segment-level linking runs; nothing here is persisted.

use crate::graph::LinkGraph;
use crate::types::{ObjectCollection, ObjectId};

// ---------------------------------------------------------------------------
// Union-Find (path halving + union by rank)
// ---------------------------------------------------------------------------

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]]; // path halving
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One track segment: a connected component of the link graph ordered by
/// frame.
#[derive(Clone, Debug)]
pub struct Segment {
    /// Object with the earliest frame.
    pub start: ObjectId,
    /// Object with the latest frame.
    pub end: ObjectId,
    /// Remaining objects, frame-ascending. May be empty.
    pub middle: Vec<ObjectId>,
}

/// All segments of a link graph, with flattened terminal/interior lists for
/// the segment-linking candidate loops.
#[derive(Clone, Debug, Default)]
pub struct SegmentDecomposition {
    pub segments: Vec<Segment>,
}

impl SegmentDecomposition {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every segment end (gap-closing and merging sources).
    pub fn ends(&self) -> Vec<ObjectId> {
        self.segments.iter().map(|s| s.end).collect()
    }

    /// Every segment start (gap-closing and splitting targets).
    pub fn starts(&self) -> Vec<ObjectId> {
        self.segments.iter().map(|s| s.start).collect()
    }

    /// Every segment-interior object, flattened segment by segment.
    pub fn middles(&self) -> Vec<ObjectId> {
        self.segments
            .iter()
            .flat_map(|s| s.middle.iter().copied())
            .collect()
    }
}

/// Decompose the link graph into track segments.
///
/// Members of each component are sorted by `(frame, id)`; two objects of one
/// component sharing a frame is a caller error, but the stable sort keeps
/// the decomposition well-defined rather than crashing. Pure: the graph is
/// not modified.
pub fn split(graph: &LinkGraph, collection: &ObjectCollection) -> SegmentDecomposition {
    let n = graph.n_objects();
    let mut uf = UnionFind::new(n);
    for edge in graph.edges() {
        uf.union(edge.source.index(), edge.target.index());
    }

    // Gather members per root, skipping unlinked objects; iterating ids in
    // order keeps member lists and segment order deterministic.
    let mut members: Vec<Vec<ObjectId>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for i in 0..n {
        let id = ObjectId(i as u32);
        if graph.degree(id) == 0 {
            continue;
        }
        let root = uf.find(i);
        if members[root].is_empty() {
            roots.push(root);
        }
        members[root].push(id);
    }

    let mut segments = Vec::with_capacity(roots.len());
    for root in roots {
        let mut component = std::mem::take(&mut members[root]);
        if component.len() < 2 {
            continue;
        }
        component.sort_by_key(|&id| (collection.get(id).frame, id));
        let start = component[0];
        let end = *component.last().expect("component has at least 2 members");
        let middle = component[1..component.len() - 1].to_vec();
        segments.push(Segment { start, end, middle });
    }

    SegmentDecomposition { segments }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackObject;

    fn path_collection(frames: &[i64]) -> (ObjectCollection, Vec<ObjectId>) {
        let mut coll = ObjectCollection::new();
        let ids = frames
            .iter()
            .map(|&f| coll.push(TrackObject::new(f, f as f64, 0.0, 0.0, 1.0)))
            .collect();
        (coll, ids)
    }

    #[test]
    fn five_node_path_yields_one_segment() {
        let (coll, ids) = path_collection(&[0, 1, 2, 3, 4]);
        let mut graph = LinkGraph::new(coll.len());
        for w in ids.windows(2) {
            graph.add_edge(w[0], w[1], 1.0);
        }

        let decomposition = split(&graph, &coll);
        assert_eq!(decomposition.segments.len(), 1);
        let seg = &decomposition.segments[0];
        assert_eq!(seg.start, ids[0]);
        assert_eq!(seg.end, ids[4]);
        assert_eq!(seg.middle, vec![ids[1], ids[2], ids[3]]);
    }

    #[test]
    fn isolated_nodes_yield_no_segments() {
        let (coll, _ids) = path_collection(&[0, 1, 2]);
        let graph = LinkGraph::new(coll.len());
        assert!(split(&graph, &coll).is_empty());
    }

    #[test]
    fn two_components_yield_two_segments() {
        let (coll, ids) = path_collection(&[0, 1, 0, 1, 2]);
        let mut graph = LinkGraph::new(coll.len());
        graph.add_edge(ids[0], ids[1], 1.0);
        graph.add_edge(ids[2], ids[3], 1.0);
        graph.add_edge(ids[3], ids[4], 1.0);

        let decomposition = split(&graph, &coll);
        assert_eq!(decomposition.segments.len(), 2);
        assert_eq!(decomposition.ends().len(), 2);
        assert_eq!(decomposition.middles(), vec![ids[3]]);
    }

    #[test]
    fn members_are_ordered_by_frame_not_insertion() {
        // Edge inserted from the later object to the earlier one.
        let (coll, ids) = path_collection(&[7, 3]);
        let mut graph = LinkGraph::new(coll.len());
        graph.add_edge(ids[0], ids[1], 1.0);

        let decomposition = split(&graph, &coll);
        let seg = &decomposition.segments[0];
        assert_eq!(seg.start, ids[1], "frame 3 object starts the segment");
        assert_eq!(seg.end, ids[0]);
        assert!(seg.middle.is_empty());
    }
}
