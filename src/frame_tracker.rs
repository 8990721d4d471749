//! Frame-to-frame linking: the first tracking stage.
//!
//! Every pair of consecutive non-empty frames is linked independently —
//! build the linking cost matrix, solve, insert accepted edges — which makes
//! this stage embarrassingly parallel. Edges from different frame pairs
//! never conflict, so the output graph is the same regardless of completion
//! order; the shared graph lock is held only during edge insertion.

use crate::builder::linking_matrix;
use crate::config::TrackerConfig;
use crate::cost::CostFunction;
use crate::error::TrackingError;
use crate::graph::LinkGraph;
use crate::linker::link_with_cancel;
use crate::types::ObjectCollection;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Run frame-to-frame linking over the whole collection, appending accepted
/// edges to `graph`.
///
/// All frame pairs run to completion; the first failure in frame order is
/// returned (wrapped with its frame pair) after the barrier, so a partially
/// linked graph is never silently reported as success.
pub fn process(
    collection: &ObjectCollection,
    config: &TrackerConfig,
    graph: &Mutex<LinkGraph>,
    cancel: &Arc<AtomicBool>,
) -> Result<(), TrackingError> {
    let frames = collection.non_empty_frames();
    if frames.len() < 2 {
        debug!(n_frames = frames.len(), "nothing to link frame to frame");
        return Ok(());
    }

    // Consecutive non-empty frames; the gap between them is not
    // necessarily 1.
    let frame_pairs: Vec<(i64, i64)> = frames.windows(2).map(|w| (w[0], w[1])).collect();

    let cost_fn = CostFunction::for_penalties(&config.linking_feature_penalties);
    let cost_threshold = config.max_linking_distance * config.max_linking_distance;

    debug!(n_pairs = frame_pairs.len(), "frame-to-frame linking");

    let results: Vec<Result<usize, TrackingError>> = frame_pairs
        .par_iter()
        .map(|&(frame0, frame1)| {
            if cancel.load(Ordering::Relaxed) {
                return Err(TrackingError::Cancelled);
            }
            link_frame_pair(
                collection, config, &cost_fn, cost_threshold, frame0, frame1, graph, cancel,
            )
            .map_err(|e| e.in_frame_pair(frame0, frame1))
        })
        .collect();

    let mut n_links = 0;
    for result in results {
        n_links += result?;
    }
    debug!(n_links, "frame-to-frame linking done");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn link_frame_pair(
    collection: &ObjectCollection,
    config: &TrackerConfig,
    cost_fn: &CostFunction,
    cost_threshold: f64,
    frame0: i64,
    frame1: i64,
    graph: &Mutex<LinkGraph>,
    cancel: &Arc<AtomicBool>,
) -> Result<usize, TrackingError> {
    let sources = collection.frame_objects(frame0);
    let targets = collection.frame_objects(frame1);

    // The frame-to-frame alternative cost uses the maximum accepted cost
    // (percentile 1), scaled by the configured factor.
    let Some(built) = linking_matrix(
        sources,
        targets,
        collection,
        cost_fn,
        cost_threshold,
        config.alternative_cost_factor,
        1.0,
        false,
    )?
    else {
        return Ok(0);
    };

    let matching = link_with_cancel(&built, Some(Arc::clone(cancel)))?;
    let n_links = matching.len();

    // The solve ran lock-free; only edge insertion is serialized.
    let mut graph = graph.lock().expect("link graph lock");
    for accepted in matching {
        graph.add_edge(accepted.source, accepted.target, accepted.cost);
    }
    Ok(n_links)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
