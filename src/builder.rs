//! Cost-matrix builders: turn candidate links into the sparse matrix the
//! solver consumes, together with the row/column object lists and the
//! alternative (no-link) cost.
//!
//! Two entry points:
//! - [`linking_matrix`] enumerates a full source × target cross product
//!   under a cost threshold (frame-to-frame stage);
//! - [`candidate_matrix`] compacts an already-gated [`CandidateList`]
//!   (segment stage, where frame-gap gates run before cost evaluation).

use crate::cost::CostFunction;
use crate::error::TrackingError;
use crate::matrix::SparseCostMatrix;
use crate::types::{ObjectCollection, ObjectId};

// ---------------------------------------------------------------------------
// Candidate buffers
// ---------------------------------------------------------------------------

/// Growable parallel buffers accumulating `(source, target, cost)` candidate
/// assignments before compaction.
#[derive(Clone, Debug, Default)]
pub struct CandidateList {
    sources: Vec<ObjectId>,
    targets: Vec<ObjectId>,
    costs: Vec<f64>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: ObjectId, target: ObjectId, cost: f64) {
        self.sources.push(source);
        self.targets.push(target);
        self.costs.push(cost);
    }

    /// Move every candidate of `other` into this list.
    pub fn append(&mut self, other: &mut CandidateList) {
        self.sources.append(&mut other.sources);
        self.targets.append(&mut other.targets);
        self.costs.append(&mut other.costs);
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built matrix
// ---------------------------------------------------------------------------

/// A cost matrix ready for the linker: the sparse costs, the object behind
/// each row and column, and the alternative cost of not linking.
#[derive(Clone, Debug)]
pub struct BuiltMatrix {
    pub matrix: SparseCostMatrix,
    /// `sources[i]` is the object of row `i`. Sorted by id.
    pub sources: Vec<ObjectId>,
    /// `targets[j]` is the object of column `j`. Sorted by id.
    pub targets: Vec<ObjectId>,
    /// Cost charged for leaving a row or column unlinked.
    pub alternative_cost: f64,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the frame-to-frame linking matrix from two object lists.
///
/// Every `(source, target)` pair is evaluated with `cost_fn` and admitted
/// when `cost < cost_threshold` (and, with `forbid_self_links`, when the two
/// objects differ). Returns `Ok(None)` when no pair is admissible: nothing
/// to link, not an error.
#[allow(clippy::too_many_arguments)]
pub fn linking_matrix(
    sources: &[ObjectId],
    targets: &[ObjectId],
    collection: &ObjectCollection,
    cost_fn: &CostFunction,
    cost_threshold: f64,
    alternative_cost_factor: f64,
    percentile: f64,
    forbid_self_links: bool,
) -> Result<Option<BuiltMatrix>, TrackingError> {
    let mut candidates = CandidateList::new();
    for &source in sources {
        let s = collection.get(source);
        for &target in targets {
            if forbid_self_links && source == target {
                continue;
            }
            let cost = cost_fn.cost(s, collection.get(target));
            check_cost(cost, source, target)?;
            if cost < cost_threshold {
                candidates.push(source, target, cost);
            }
        }
    }

    if candidates.is_empty() {
        return Ok(None);
    }
    candidate_matrix(&candidates, alternative_cost_factor, percentile).map(Some)
}

/// Compact a candidate list into a sparse cost matrix.
///
/// Unique sources and targets are collected and sorted by object id, which
/// fixes the row/column order deterministically; candidates are then sorted
/// by `(row, col)` for the row-compressed layout. A repeated `(row, col)`
/// pair is a fatal construction error.
pub fn candidate_matrix(
    candidates: &CandidateList,
    alternative_cost_factor: f64,
    percentile: f64,
) -> Result<BuiltMatrix, TrackingError> {
    if candidates.is_empty() {
        // The "nothing to link" case belongs to the callers, which skip the
        // build entirely.
        return Err(TrackingError::MalformedMatrix(
            "cannot build a cost matrix from an empty candidate list".to_string(),
        ));
    }

    let sources = sorted_unique(&candidates.sources);
    let targets = sorted_unique(&candidates.targets);

    // Map each candidate to dense (row, col) indices and order them.
    let mut triples: Vec<(usize, usize, f64)> = candidates
        .sources
        .iter()
        .zip(&candidates.targets)
        .zip(&candidates.costs)
        .map(|((&s, &t), &cost)| {
            check_cost(cost, s, t)?;
            let row = sources.binary_search(&s).expect("source is in unique list");
            let col = targets.binary_search(&t).expect("target is in unique list");
            Ok((row, col, cost))
        })
        .collect::<Result<_, TrackingError>>()?;
    triples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    for pair in triples.windows(2) {
        if pair[0].0 == pair[1].0 && pair[0].1 == pair[1].1 {
            return Err(TrackingError::DuplicateAssignment {
                source_id: sources[pair[0].0].to_string(),
                target: targets[pair[0].1].to_string(),
            });
        }
    }

    let mut costs = Vec::with_capacity(triples.len());
    let mut col_index = Vec::with_capacity(triples.len());
    let mut row_count = vec![0usize; sources.len()];
    for &(row, col, cost) in &triples {
        costs.push(cost);
        col_index.push(col);
        row_count[row] += 1;
    }

    let alternative_cost = alternative_cost_factor * percentile_of(&costs, percentile);
    let matrix = SparseCostMatrix::new(costs, col_index, row_count, targets.len())?;

    Ok(BuiltMatrix {
        matrix,
        sources,
        targets,
        alternative_cost,
    })
}

fn check_cost(cost: f64, source: ObjectId, target: ObjectId) -> Result<(), TrackingError> {
    if cost.is_nan() {
        return Err(TrackingError::Numeric(format!(
            "cost of linking {source} to {target} is NaN"
        )));
    }
    if cost < 0.0 {
        return Err(TrackingError::Numeric(format!(
            "cost of linking {source} to {target} is negative ({cost})"
        )));
    }
    Ok(())
}

fn sorted_unique(ids: &[ObjectId]) -> Vec<ObjectId> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Percentile of a sample with linear interpolation between order
/// statistics. `p == 1` returns the maximum.
fn percentile_of(values: &[f64], p: f64) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("costs are never NaN here"));
    if p >= 1.0 {
        return *sorted.last().expect("non-empty");
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;
    if lo + 1 < sorted.len() {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    } else {
        sorted[lo]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
