//! Links two object lists with the LAP framework of Jaqaman et al.,
//! Nature Methods 5, 2008 (figure 1b).
//!
//! The built cost matrix becomes the top-left quadrant of a square matrix
//! whose other quadrants encode the option of not linking: top-right and
//! bottom-left carry the alternative cost on their diagonals (track death
//! and birth), and the bottom-right transpose block makes the matrix
//! solvable. One solver run then decides all links and non-links together.

use crate::builder::BuiltMatrix;
use crate::error::TrackingError;
use crate::matrix::SparseCostMatrix;
use crate::solver::SparseLapSolver;
use crate::types::ObjectId;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// An accepted link with its realized cost (the edge weight).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptedLink {
    pub source: ObjectId,
    pub target: ObjectId,
    pub cost: f64,
}

/// The accepted links of one linker pass. Sources and targets absent from
/// it found no acceptable partner — that is a normal outcome, not an error.
pub type Matching = Vec<AcceptedLink>;

/// Solve the assignment problem for a built cost matrix.
///
/// Assignments landing outside the top-left quadrant are non-links. As a
/// final guard, an assignment whose realized cost exceeds the alternative
/// cost is reverted: declining to link is always an option.
pub fn link(built: &BuiltMatrix) -> Result<Matching, TrackingError> {
    link_with_cancel(built, None)
}

/// [`link`], with a cooperative cancellation flag passed to the solver.
pub fn link_with_cancel(
    built: &BuiltMatrix,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Matching, TrackingError> {
    let tl = &built.matrix;
    let n_rows = tl.n_rows();
    let n_cols = tl.n_cols();
    if n_rows == 0 || n_cols == 0 {
        return Ok(Matching::new());
    }

    let alternative = built.alternative_cost;
    if !alternative.is_finite() || alternative < 0.0 {
        return Err(TrackingError::Numeric(format!(
            "alternative cost must be finite and non-negative, was {alternative}"
        )));
    }

    let tr = SparseCostMatrix::diagonal(n_rows, alternative);
    let bl = SparseCostMatrix::diagonal(n_cols, alternative);
    let br = tl.transpose().fill_with(alternative);
    let full = tl.hcat(&tr)?.vcat(&bl.hcat(&br)?)?;

    let mut solver = SparseLapSolver::new(&full);
    if let Some(flag) = cancel {
        solver = solver.with_cancel_flag(flag);
    }
    let assignment = solver.solve()?;

    let mut matching = Matching::new();
    for (row, &col) in assignment.iter().take(n_rows).enumerate() {
        let Some(col) = col else { continue };
        if col >= n_cols {
            continue; // assigned to its alternative: no link
        }
        let cost = full
            .get(row, col)
            .ok_or_else(|| TrackingError::Numeric("assignment to an absent cell".to_string()))?;
        if cost > alternative {
            // Cheaper than the full no-link combination, but worse than the
            // alternative itself: revert to "no link".
            continue;
        }
        matching.push(AcceptedLink {
            source: built.sources[row],
            target: built.targets[col],
            cost,
        });
    }
    Ok(matching)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
