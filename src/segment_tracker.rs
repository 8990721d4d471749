//! Segment linking: the second tracking stage.
//!
//! Decomposes the frame-to-frame graph into track segments, then pools
//! candidates from up to three families into one cost matrix:
//!
//! - **gap closing** — segment end → segment start, frame gap in
//!   `[1, max_frame_gap]`;
//! - **merging** — segment end → segment middle, frame gap exactly 1;
//! - **splitting** — segment middle → segment start, frame gap exactly 1.
//!
//! Pooling gives all families one shared alternative cost and one solver
//! pass, so accept/reject decisions are mutually consistent: an object
//! cannot be gap-closed and merged in the same pass.

use crate::builder::{candidate_matrix, CandidateList};
use crate::config::TrackerConfig;
use crate::cost::CostFunction;
use crate::error::TrackingError;
use crate::graph::LinkGraph;
use crate::linker::link_with_cancel;
use crate::segments::{split, SegmentDecomposition};
use crate::types::{ObjectCollection, ObjectId};
use rayon::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Run gap closing, merging and splitting on the current link graph,
/// appending accepted edges to it.
pub fn process(
    collection: &ObjectCollection,
    config: &TrackerConfig,
    graph: &mut LinkGraph,
    cancel: &Arc<AtomicBool>,
) -> Result<(), TrackingError> {
    let decomposition = split(graph, collection);
    if decomposition.is_empty() {
        debug!("no track segments: skipping segment linking");
        return Ok(());
    }
    debug!(
        n_segments = decomposition.segments.len(),
        "segment linking"
    );

    let candidates = collect_candidates(collection, config, &decomposition)?;
    if candidates.is_empty() {
        debug!("no admissible segment links");
        return Ok(());
    }

    let built = candidate_matrix(
        &candidates,
        config.alternative_cost_factor,
        config.cutoff_percentile,
    )?;
    let matching = link_with_cancel(&built, Some(Arc::clone(cancel)))?;

    debug!(n_links = matching.len(), "segment linking done");
    for accepted in matching {
        graph.add_edge(accepted.source, accepted.target, accepted.cost);
    }
    Ok(())
}

/// Pool candidates from all enabled families into one list.
///
/// Work items are "per segment-end source" (gap closing and merging) and
/// "per segment-middle source" (splitting); each appends its accepted
/// candidates to the shared buffer under a single coarse lock — cost
/// evaluation dominates runtime, not the append.
fn collect_candidates(
    collection: &ObjectCollection,
    config: &TrackerConfig,
    decomposition: &SegmentDecomposition,
) -> Result<CandidateList, TrackingError> {
    let ends = decomposition.ends();
    let starts = decomposition.starts();
    let merging_or_splitting = config.allow_merging || config.allow_splitting;
    let middles = if merging_or_splitting {
        decomposition.middles()
    } else {
        Vec::new()
    };

    let gc_cost_fn = CostFunction::for_penalties(&config.gap_closing_feature_penalties);
    let gc_threshold = config.gap_closing_max_distance * config.gap_closing_max_distance;
    let m_cost_fn = CostFunction::for_penalties(&config.merging_feature_penalties);
    let m_threshold = config.merging_max_distance * config.merging_max_distance;
    let s_cost_fn = CostFunction::for_penalties(&config.splitting_feature_penalties);
    let s_threshold = config.splitting_max_distance * config.splitting_max_distance;

    let buffer = Mutex::new(CandidateList::new());

    // Segment ends source gap closings and mergings.
    ends.par_iter().try_for_each(|&end| {
        let mut local = CandidateList::new();
        let end_frame = collection.get(end).frame;

        if config.allow_gap_closing {
            for &start in &starts {
                if start == end {
                    continue;
                }
                let gap = collection.get(start).frame - end_frame;
                if gap < 1 || gap > config.max_frame_gap as i64 {
                    continue;
                }
                push_candidate(
                    &mut local,
                    collection,
                    &gc_cost_fn,
                    gc_threshold,
                    end,
                    start,
                )?;
            }
        }

        if config.allow_merging {
            for &middle in &middles {
                if collection.get(middle).frame - end_frame != 1 {
                    continue;
                }
                push_candidate(&mut local, collection, &m_cost_fn, m_threshold, end, middle)?;
            }
        }

        buffer.lock().expect("candidate buffer lock").append(&mut local);
        Ok::<(), TrackingError>(())
    })?;

    // Segment middles source splittings.
    if config.allow_splitting {
        middles.par_iter().try_for_each(|&middle| {
            let mut local = CandidateList::new();
            let middle_frame = collection.get(middle).frame;
            for &start in &starts {
                if collection.get(start).frame - middle_frame != 1 {
                    continue;
                }
                push_candidate(&mut local, collection, &s_cost_fn, s_threshold, middle, start)?;
            }
            buffer.lock().expect("candidate buffer lock").append(&mut local);
            Ok::<(), TrackingError>(())
        })?;
    }

    Ok(buffer.into_inner().expect("candidate buffer lock"))
}

fn push_candidate(
    local: &mut CandidateList,
    collection: &ObjectCollection,
    cost_fn: &CostFunction,
    threshold: f64,
    source: ObjectId,
    target: ObjectId,
) -> Result<(), TrackingError> {
    let cost = cost_fn.cost(collection.get(source), collection.get(target));
    if cost.is_nan() {
        return Err(TrackingError::Numeric(format!(
            "cost of linking {source} to {target} is NaN"
        )));
    }
    if cost < threshold {
        local.push(source, target, cost);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackObject;

    /// A track along y = `lane`, spanning `frames`, linked frame to frame.
    fn add_track(
        coll: &mut ObjectCollection,
        graph: &mut Vec<(usize, usize)>,
        lane: f64,
        frames: std::ops::Range<i64>,
    ) -> Vec<ObjectId> {
        let start = coll.len();
        let ids: Vec<ObjectId> = frames
            .map(|f| coll.push(TrackObject::new(f, f as f64, lane, 0.0, 1.0)))
            .collect();
        for i in 0..ids.len() - 1 {
            graph.push((start + i, start + i + 1));
        }
        ids
    }

    fn build_graph(coll: &ObjectCollection, edges: &[(usize, usize)]) -> LinkGraph {
        let mut graph = LinkGraph::new(coll.len());
        for &(a, b) in edges {
            graph.add_edge(ObjectId(a as u32), ObjectId(b as u32), 1.0);
        }
        graph
    }

    fn run(coll: &ObjectCollection, config: &TrackerConfig, graph: &mut LinkGraph) {
        let cancel = Arc::new(AtomicBool::new(false));
        process(coll, config, graph, &cancel).unwrap();
    }

    #[test]
    fn gap_closing_bridges_a_two_frame_gap() {
        let mut coll = ObjectCollection::new();
        let mut edges = Vec::new();
        // One track interrupted between frames 2 and 4.
        let first = add_track(&mut coll, &mut edges, 0.0, 0..3);
        let second = add_track(&mut coll, &mut edges, 0.0, 4..7);
        let mut graph = build_graph(&coll, &edges);

        let config = TrackerConfig {
            max_frame_gap: 2,
            ..Default::default()
        };
        let before = graph.edges().len();
        run(&coll, &config, &mut graph);

        assert_eq!(graph.edges().len(), before + 1, "one gap-closing link");
        let closing = graph.edges().last().unwrap();
        assert_eq!(closing.source, *first.last().unwrap());
        assert_eq!(closing.target, second[0]);
    }

    #[test]
    fn gap_beyond_max_frame_gap_stays_open() {
        let mut coll = ObjectCollection::new();
        let mut edges = Vec::new();
        add_track(&mut coll, &mut edges, 0.0, 0..3);
        add_track(&mut coll, &mut edges, 0.0, 6..9); // gap of 4 frames
        let mut graph = build_graph(&coll, &edges);

        let config = TrackerConfig {
            max_frame_gap: 2,
            ..Default::default()
        };
        let before = graph.edges().len();
        run(&coll, &config, &mut graph);
        assert_eq!(graph.edges().len(), before, "gap of 4 exceeds the limit of 2");
    }

    #[test]
    fn merging_links_an_end_into_a_middle() {
        let mut coll = ObjectCollection::new();
        let mut edges = Vec::new();
        // Long track 0..5 along y=0; short track 0..3 along y=1 whose end
        // sits one frame before the long track's middle at frame 3.
        let long = add_track(&mut coll, &mut edges, 0.0, 0..5);
        let short = add_track(&mut coll, &mut edges, 1.0, 0..3);
        let mut graph = build_graph(&coll, &edges);

        let config = TrackerConfig {
            allow_gap_closing: false,
            allow_merging: true,
            ..Default::default()
        };
        let before = graph.edges().len();
        run(&coll, &config, &mut graph);

        assert_eq!(graph.edges().len(), before + 1, "one merging link");
        let merge = graph.edges().last().unwrap();
        assert_eq!(merge.source, *short.last().unwrap(), "short track end merges");
        assert_eq!(merge.target, long[3], "into the long track middle at frame 3");
    }

    #[test]
    fn splitting_links_a_middle_into_a_start() {
        let mut coll = ObjectCollection::new();
        let mut edges = Vec::new();
        // Long track 0..5; a new track starting at frame 3 next to the long
        // track's middle at frame 2.
        let long = add_track(&mut coll, &mut edges, 0.0, 0..5);
        let branch = add_track(&mut coll, &mut edges, 1.0, 3..6);
        let mut graph = build_graph(&coll, &edges);

        let config = TrackerConfig {
            allow_gap_closing: false,
            allow_splitting: true,
            ..Default::default()
        };
        let before = graph.edges().len();
        run(&coll, &config, &mut graph);

        assert_eq!(graph.edges().len(), before + 1, "one splitting link");
        let split_edge = graph.edges().last().unwrap();
        assert_eq!(split_edge.source, long[2], "long track middle at frame 2");
        assert_eq!(split_edge.target, branch[0], "splits into the branch start");
    }

    #[test]
    fn disabled_families_produce_no_links() {
        let mut coll = ObjectCollection::new();
        let mut edges = Vec::new();
        add_track(&mut coll, &mut edges, 0.0, 0..3);
        add_track(&mut coll, &mut edges, 0.0, 4..7);
        let mut graph = build_graph(&coll, &edges);

        let config = TrackerConfig {
            allow_gap_closing: false,
            allow_merging: false,
            allow_splitting: false,
            ..Default::default()
        };
        let before = graph.edges().len();
        run(&coll, &config, &mut graph);
        assert_eq!(graph.edges().len(), before);
    }

    #[test]
    fn isolated_objects_are_ignored() {
        let mut coll = ObjectCollection::new();
        // Two isolated detections, no frame-to-frame links at all.
        coll.push(TrackObject::new(0, 0.0, 0.0, 0.0, 1.0));
        coll.push(TrackObject::new(2, 1.0, 0.0, 0.0, 1.0));
        let mut graph = LinkGraph::new(coll.len());
        run(&coll, &TrackerConfig::default(), &mut graph);
        assert!(graph.edges().is_empty());
    }
}
