//! Sparse Jonker–Volgenant solver for linear assignment problems.
//!
//! # Algorithm
//! Four phases over the sparse matrix, never materializing a dense one:
//! 1. **Column reduction** — scan columns last to first, tentatively assign
//!    each to its minimum-cost row; rows claimed twice are marked contested.
//! 2. **Reduction transfer** — tighten the column potentials of uniquely
//!    assigned rows by the smallest slack over their other columns.
//! 3. **Augmenting row reduction** (two passes) — reassign free rows to
//!    their cheapest reduced-cost column, bumping previous holders.
//! 4. **Augmentation** — Dijkstra-like shortest augmenting path per
//!    remaining free row, over a partitioned column array, expanding only
//!    along each scanned row's sparse entries.
//!
//! Follows Volgenant, "Linear and semi-assignment problems: a core oriented
//! approach", Computers & Operations Research 23(10), 1996.
//!
//! Unlike the textbook setting, rows and columns with no admissible entry
//! are legal here: such rows are reported unassigned and the solver still
//! terminates. Ties in reduced cost break toward the column encountered
//! first in the left-to-right scan, so results are deterministic.

use crate::error::TrackingError;
use crate::matrix::SparseCostMatrix;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sparse LAP solver over a borrowed cost matrix.
///
/// The solve is a pure function of the matrix; the optional cancellation
/// flag is checked between phases.
pub struct SparseLapSolver<'a> {
    matrix: &'a SparseCostMatrix,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> SparseLapSolver<'a> {
    pub fn new(matrix: &'a SparseCostMatrix) -> Self {
        Self {
            matrix,
            cancel: None,
        }
    }

    /// Check the given flag between solver phases and abandon the solve
    /// when it is raised.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Compute the minimum-cost row → column assignment.
    ///
    /// `result[i]` is the column assigned to row `i`, or `None` for rows
    /// that cannot be assigned (no admissible column, or fewer columns than
    /// rows). Fails fast on NaN or negative costs before any phase runs.
    pub fn solve(&self) -> Result<Vec<Option<usize>>, TrackingError> {
        let m = self.matrix;
        for &cost in m.costs() {
            if cost.is_nan() {
                return Err(TrackingError::Numeric(
                    "cost matrix contains NaN".to_string(),
                ));
            }
            if cost < 0.0 {
                return Err(TrackingError::Numeric(format!(
                    "cost matrix contains a negative cost ({cost})"
                )));
            }
        }

        let n_rows = m.n_rows();
        let n_cols = m.n_cols();
        if n_rows == 0 || n_cols == 0 {
            return Ok(vec![None; n_rows]);
        }

        // With more rows than columns, not every row can be assigned; the
        // transposed problem has the shape the algorithm expects, and its
        // assignment inverts back.
        if n_rows > n_cols {
            let transposed = m.transpose();
            let sub = SparseLapSolver {
                matrix: &transposed,
                cancel: self.cancel.clone(),
            };
            let by_column = sub.solve()?;
            let mut result = vec![None; n_rows];
            for (col, &row) in by_column.iter().enumerate() {
                if let Some(row) = row {
                    result[row] = Some(col);
                }
            }
            return Ok(result);
        }

        // x[i] = j+1 when row i is assigned to column j, 0 when free;
        // negated while a tentative assignment is contested.
        // y[j] = i+1 when column j is assigned to row i, 0 when free.
        let mut x = vec![0i64; n_rows];
        let mut y = vec![0i64; n_cols];
        let mut v = vec![f64::INFINITY; n_cols];
        let mut free: Vec<usize>;

        if n_rows < n_cols {
            // Strictly rectangular: the column-reduction potentials are not
            // feasible for a problem whose spare columns stay unmatched (an
            // unmatched column needs a non-positive potential). Zero
            // potentials are, so go straight to shortest augmenting paths.
            v.iter_mut().for_each(|slot| *slot = 0.0);
            free = (0..n_rows).collect();
        } else {
            // -------------------------------------------------------------
            // Phase 1: column reduction
            // -------------------------------------------------------------
            for i in 0..n_rows {
                for (j, cost) in m.row(i) {
                    if cost < v[j] {
                        v[j] = cost;
                        y[j] = (i + 1) as i64;
                    }
                }
            }
            for j in (0..n_cols).rev() {
                if y[j] == 0 {
                    // Column with no admissible row: stays unassigned.
                    continue;
                }
                let i = (y[j] - 1) as usize;
                if x[i] == 0 {
                    x[i] = (j + 1) as i64;
                } else {
                    if x[i] > 0 {
                        x[i] = -x[i];
                    }
                    y[j] = 0;
                }
            }

            if self.cancelled() {
                return Err(TrackingError::Cancelled);
            }

            // -------------------------------------------------------------
            // Phase 2: reduction transfer
            // -------------------------------------------------------------
            free = Vec::with_capacity(n_rows);
            for i in 0..n_rows {
                if x[i] == 0 {
                    free.push(i);
                } else if x[i] < 0 {
                    // Contested: no reduction transfer possible.
                    x[i] = -x[i];
                } else {
                    let j1 = (x[i] - 1) as usize;
                    let mut min = f64::INFINITY;
                    for (j, cost) in m.row(i) {
                        if j != j1 && cost - v[j] < min {
                            min = cost - v[j];
                        }
                    }
                    // Single-entry rows have no other column to transfer to.
                    if min.is_finite() {
                        v[j1] -= min;
                    }
                }
            }
            if free.is_empty() {
                return Ok(decode(&y, n_rows));
            }

            if self.cancelled() {
                return Err(TrackingError::Cancelled);
            }

            // -------------------------------------------------------------
            // Phase 3: augmenting row reduction, two passes
            // -------------------------------------------------------------
            for _pass in 0..2 {
                let mut next_free: Vec<usize> = Vec::new();
                let mut k = 0;
                while k < free.len() {
                    let i = free[k];
                    k += 1;

                    // Two smallest reduced costs v0 <= vj over row i,
                    // keeping the first column on ties.
                    let mut v0 = f64::INFINITY;
                    let mut vj = f64::INFINITY;
                    let mut j0: Option<usize> = None;
                    let mut j1: Option<usize> = None;
                    for (j, cost) in m.row(i) {
                        let h = cost - v[j];
                        if h < vj {
                            if h > v0 {
                                vj = h;
                                j1 = Some(j);
                            } else {
                                vj = v0;
                                j1 = j0;
                                v0 = h;
                                j0 = Some(j);
                            }
                        }
                    }
                    let Some(mut best) = j0 else {
                        // Row with no admissible column: never assignable.
                        continue;
                    };

                    let has_second = j1.is_some();
                    let mut holder = y[best];
                    if v0 < vj {
                        if has_second {
                            v[best] -= vj - v0;
                        }
                    } else if let (Some(second), true) = (j1, holder > 0) {
                        best = second;
                        holder = y[second];
                    }
                    if holder > 0 {
                        let bumped = (holder - 1) as usize;
                        if has_second && v0 < vj {
                            // Re-examine the bumped row immediately.
                            k -= 1;
                            free[k] = bumped;
                        } else {
                            next_free.push(bumped);
                        }
                    }
                    x[i] = (best + 1) as i64;
                    y[best] = (i + 1) as i64;
                }
                free = next_free;
            }
        }

        if self.cancelled() {
            return Err(TrackingError::Cancelled);
        }

        // -----------------------------------------------------------------
        // Phase 4: augmentation
        // -----------------------------------------------------------------
        //
        // `col` is a permutation of the columns partitioned as
        //   [0, low)   scanned
        //   [low, up)  tight (distance equal to the current minimum)
        //   [up, lab)  labeled (finite distance)
        //   [lab, ..)  unreached
        // and `pos` is its inverse, giving O(1) zone membership tests.
        let mut col: Vec<usize> = (0..n_cols).collect();
        let mut pos: Vec<usize> = (0..n_cols).collect();
        let mut d = vec![f64::INFINITY; n_cols];
        let mut pred = vec![0usize; n_cols];

        for &free_row in &free {
            if m.row_len(free_row) == 0 {
                continue;
            }
            d.iter_mut().for_each(|slot| *slot = f64::INFINITY);
            let (mut low, mut up, mut lab) = (0usize, 0usize, 0usize);
            for (j, cost) in m.row(free_row) {
                d[j] = cost - v[j];
                pred[j] = free_row;
                promote(&mut col, &mut pos, j, lab);
                lab += 1;
            }

            let mut min = 0.0f64;
            let mut last = 0usize;
            let mut sink: Option<usize> = None;
            'search: loop {
                if low == up {
                    if lab == low {
                        // No reachable column left: the row stays
                        // unassigned. Duals were not touched, so nothing
                        // needs undoing.
                        break 'search;
                    }
                    last = low;
                    min = d[col[low]];
                    for k in low + 1..lab {
                        let j = col[k];
                        if d[j] < min {
                            min = d[j];
                        }
                    }
                    for k in low..lab {
                        let j = col[k];
                        if d[j] == min {
                            promote(&mut col, &mut pos, j, up);
                            up += 1;
                        }
                    }
                    for k in last..up {
                        let j = col[k];
                        if y[j] == 0 {
                            sink = Some(j);
                            break 'search;
                        }
                    }
                }

                // Scan one tight column: expand along the sparse entries of
                // the row currently holding it.
                let j1 = col[low];
                low += 1;
                let i = (y[j1] - 1) as usize;
                let Some(cost_ij1) = m.get(i, j1) else {
                    continue;
                };
                let u1 = cost_ij1 - v[j1] - min;
                for (j, cost) in m.row(i) {
                    if pos[j] < low {
                        continue; // already scanned
                    }
                    let h = cost - v[j] - u1;
                    if h < d[j] {
                        d[j] = h;
                        pred[j] = i;
                        if pos[j] >= lab {
                            promote(&mut col, &mut pos, j, lab);
                            lab += 1;
                        }
                        if h == min {
                            if y[j] == 0 {
                                sink = Some(j);
                                break 'search;
                            }
                            if pos[j] >= up {
                                promote(&mut col, &mut pos, j, up);
                                up += 1;
                            }
                        }
                    }
                }
            }

            if let Some(sink) = sink {
                // Price update for the scanned columns.
                for k in 0..last {
                    let j0 = col[k];
                    v[j0] += d[j0] - min;
                }
                // Augment: flip assignments along the predecessor chain.
                let mut j = sink;
                loop {
                    let i = pred[j];
                    y[j] = (i + 1) as i64;
                    let previous = x[i];
                    x[i] = (j + 1) as i64;
                    if i == free_row {
                        break;
                    }
                    j = (previous - 1) as usize;
                }
            }
        }

        Ok(decode(&y, n_rows))
    }
}

/// Swap column `j` into slot `slot` of the partition, keeping `pos` the
/// inverse of `col`.
#[inline]
fn promote(col: &mut [usize], pos: &mut [usize], j: usize, slot: usize) {
    let from = pos[j];
    col.swap(from, slot);
    pos[col[from]] = from;
    pos[col[slot]] = slot;
}

/// Read the assignment off the column side: a bumped row can keep a stale
/// `x` entry, but `y` always names each column's current holder.
fn decode(y: &[i64], n_rows: usize) -> Vec<Option<usize>> {
    let mut result = vec![None; n_rows];
    for (j, &yj) in y.iter().enumerate() {
        if yj > 0 {
            result[(yj - 1) as usize] = Some(j);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn dense_matrix(rows: &[&[f64]]) -> SparseCostMatrix {
        let n_cols = rows[0].len();
        let mut costs = Vec::new();
        let mut col_index = Vec::new();
        let mut row_count = Vec::new();
        for row in rows {
            let mut count = 0;
            for (j, &c) in row.iter().enumerate() {
                if c.is_finite() {
                    costs.push(c);
                    col_index.push(j);
                    count += 1;
                }
            }
            row_count.push(count);
        }
        SparseCostMatrix::new(costs, col_index, row_count, n_cols).unwrap()
    }

    /// Minimum total cost over all complete row assignments, by exhaustive
    /// permutation search. `None` when no complete assignment exists.
    fn brute_force(dense: &[Vec<f64>]) -> Option<f64> {
        fn recurse(dense: &[Vec<f64>], row: usize, used: &mut [bool], acc: f64) -> Option<f64> {
            if row == dense.len() {
                return Some(acc);
            }
            let mut best = None;
            for (col, &cost) in dense[row].iter().enumerate() {
                if used[col] || !cost.is_finite() {
                    continue;
                }
                used[col] = true;
                if let Some(total) = recurse(dense, row + 1, used, acc + cost) {
                    best = Some(best.map_or(total, |b: f64| b.min(total)));
                }
                used[col] = false;
            }
            best
        }
        let mut used = vec![false; dense[0].len()];
        recurse(dense, 0, &mut used, 0.0)
    }

    fn assert_valid_matching(assignment: &[Option<usize>]) {
        let mut seen = std::collections::HashSet::new();
        for col in assignment.iter().flatten() {
            assert!(seen.insert(*col), "column {col} assigned to two rows");
        }
    }

    #[test]
    fn two_by_two_picks_the_cheap_diagonal() {
        let m = dense_matrix(&[&[1.0, 10.0], &[10.0, 1.0]]);
        let result = SparseLapSolver::new(&m).solve().unwrap();
        assert_eq!(result, vec![Some(0), Some(1)]);
    }

    #[test]
    fn three_by_three_known_optimum() {
        // Optimal: row0→col1 (1), row1→col0 (2), row2→col2 (2) = 5
        let m = dense_matrix(&[&[4.0, 1.0, 3.0], &[2.0, 0.0, 5.0], &[3.0, 2.0, 2.0]]);
        let result = SparseLapSolver::new(&m).solve().unwrap();
        let assigned: Vec<usize> = result.iter().map(|c| c.unwrap()).collect();
        let total: f64 = assigned
            .iter()
            .enumerate()
            .map(|(i, &j)| m.get(i, j).unwrap())
            .sum();
        assert_eq!(total, 5.0, "expected total cost 5, got {total}");
    }

    #[test]
    fn crossing_is_avoided() {
        // Sources at 0 and 10, targets at 1 and 11: straight assignment
        // costs 1 + 1, crossed costs 121 + 81.
        let m = dense_matrix(&[&[1.0, 121.0], &[81.0, 1.0]]);
        let result = SparseLapSolver::new(&m).solve().unwrap();
        assert_eq!(result, vec![Some(0), Some(1)]);
        assert_eq!(m.total_assignment_cost(&result), 2.0);
    }

    #[test]
    fn matches_brute_force_on_random_dense_instances() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for size in 2..=7 {
            for _ in 0..20 {
                let dense: Vec<Vec<f64>> = (0..size)
                    .map(|_| (0..size).map(|_| rng.gen_range(1.0f64..100.0).floor()).collect())
                    .collect();
                let rows: Vec<&[f64]> = dense.iter().map(Vec::as_slice).collect();
                let m = dense_matrix(&rows);
                let result = SparseLapSolver::new(&m).solve().unwrap();
                assert_valid_matching(&result);
                let total = m.total_assignment_cost(&result);
                let expected = brute_force(&dense).unwrap();
                assert!(
                    (total - expected).abs() < 1e-9,
                    "size {size}: solver found {total}, brute force {expected}"
                );
            }
        }
    }

    #[test]
    fn matches_brute_force_on_random_sparse_instances() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..50 {
            let size = rng.gen_range(3..=7);
            // Diagonal always present so a complete assignment exists.
            let dense: Vec<Vec<f64>> = (0..size)
                .map(|i| {
                    (0..size)
                        .map(|j| {
                            if i == j || rng.gen_bool(0.4) {
                                rng.gen_range(1.0f64..100.0).floor()
                            } else {
                                f64::INFINITY
                            }
                        })
                        .collect()
                })
                .collect();
            let rows: Vec<&[f64]> = dense.iter().map(Vec::as_slice).collect();
            let m = dense_matrix(&rows);
            let result = SparseLapSolver::new(&m).solve().unwrap();
            assert_valid_matching(&result);
            let total = m.total_assignment_cost(&result);
            let expected = brute_force(&dense).unwrap();
            assert!(
                (total - expected).abs() < 1e-9,
                "sparse {size}×{size}: solver found {total}, brute force {expected}"
            );
        }
    }

    #[test]
    fn matches_brute_force_on_rectangular_instances() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        for _ in 0..30 {
            let rows = rng.gen_range(1..=4);
            let cols = rng.gen_range(rows..=6);
            let dense: Vec<Vec<f64>> = (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(1.0f64..100.0).floor()).collect())
                .collect();
            let slices: Vec<&[f64]> = dense.iter().map(Vec::as_slice).collect();
            let m = dense_matrix(&slices);
            let result = SparseLapSolver::new(&m).solve().unwrap();
            assert_valid_matching(&result);
            let total = m.total_assignment_cost(&result);
            let expected = brute_force(&dense).unwrap();
            assert!(
                (total - expected).abs() < 1e-9,
                "{rows}×{cols}: solver found {total}, brute force {expected}"
            );
        }
    }

    #[test]
    fn row_without_admissible_columns_stays_unassigned() {
        let m = dense_matrix(&[
            &[1.0, f64::INFINITY],
            &[f64::INFINITY, f64::INFINITY],
        ]);
        let result = SparseLapSolver::new(&m).solve().unwrap();
        assert_eq!(result[0], Some(0));
        assert_eq!(result[1], None, "empty row must terminate unassigned");
    }

    #[test]
    fn more_rows_than_columns_terminates() {
        // Two rows competing for one column: the cheaper row wins.
        let m = dense_matrix(&[&[5.0], &[2.0]]);
        let result = SparseLapSolver::new(&m).solve().unwrap();
        assert_valid_matching(&result);
        assert_eq!(result[1], Some(0));
        assert_eq!(result[0], None);
    }

    #[test]
    fn rectangular_with_spare_columns() {
        let m = dense_matrix(&[&[9.0, 2.0, 7.0]]);
        let result = SparseLapSolver::new(&m).solve().unwrap();
        assert_eq!(result, vec![Some(1)]);
    }

    #[test]
    fn empty_matrix_solves_to_nothing() {
        let m = SparseCostMatrix::empty();
        assert!(SparseLapSolver::new(&m).solve().unwrap().is_empty());
    }

    #[test]
    fn nan_cost_fails_fast() {
        let m = SparseCostMatrix::new(vec![f64::NAN], vec![0], vec![1], 1).unwrap();
        let err = SparseLapSolver::new(&m).solve().unwrap_err();
        assert!(matches!(err, TrackingError::Numeric(_)));
    }

    #[test]
    fn negative_cost_fails_fast() {
        let m = SparseCostMatrix::new(vec![-1.0], vec![0], vec![1], 1).unwrap();
        assert!(SparseLapSolver::new(&m).solve().is_err());
    }

    #[test]
    fn cancellation_aborts_the_solve() {
        let m = dense_matrix(&[&[1.0, 2.0], &[2.0, 1.0]]);
        let flag = Arc::new(AtomicBool::new(true));
        let err = SparseLapSolver::new(&m)
            .with_cancel_flag(flag)
            .solve()
            .unwrap_err();
        assert!(matches!(err, TrackingError::Cancelled));
    }

    #[test]
    fn repeated_solves_are_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let dense: Vec<Vec<f64>> = (0..6)
            .map(|_| (0..6).map(|_| rng.gen_range(1.0f64..10.0).floor()).collect())
            .collect();
        let rows: Vec<&[f64]> = dense.iter().map(Vec::as_slice).collect();
        let m = dense_matrix(&rows);
        let first = SparseLapSolver::new(&m).solve().unwrap();
        let second = SparseLapSolver::new(&m).solve().unwrap();
        assert_eq!(first, second);
    }
}
