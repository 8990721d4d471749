//! Compressed row-sparse storage for assignment cost matrices.
//!
//! Only admissible (finite-cost) entries are stored; a missing entry is an
//! implicitly forbidden assignment. Storage follows the row-compressed
//! convention of Volgenant, "Linear and semi-assignment problems: a core
//! oriented approach", Computers & Operations Research 23(10), 1996.
//!
//! Matrices are immutable once built: every operation returns a new matrix.

use crate::error::TrackingError;

/// A sparse, possibly rectangular cost matrix for linear assignment
/// problems. Rows are sources, columns are targets.
///
/// Invariants, enforced at construction:
/// - `costs` and `col_index` have the same length (the cardinality);
/// - within each row, column indices strictly increase (enables binary
///   search and ordered merges);
/// - every column index is below `n_cols`.
///
/// A matrix with zero rows or zero columns is a valid degenerate value
/// meaning "no admissible links". Rows with zero stored entries are also
/// legal; such rows can never be assigned and the solver reports them
/// unassigned.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseCostMatrix {
    /// Flat array of admissible costs, row by row.
    costs: Vec<f64>,
    /// Column index of each cost, parallel to `costs`.
    col_index: Vec<usize>,
    /// Offset into `costs`/`col_index` where each row starts.
    row_start: Vec<usize>,
    /// Number of stored entries per row.
    row_count: Vec<usize>,
    n_cols: usize,
}

impl SparseCostMatrix {
    /// Build a matrix from its raw CRS arrays. The number of rows is
    /// `row_count.len()`.
    pub fn new(
        costs: Vec<f64>,
        col_index: Vec<usize>,
        row_count: Vec<usize>,
        n_cols: usize,
    ) -> Result<Self, TrackingError> {
        if costs.len() != col_index.len() {
            return Err(TrackingError::MalformedMatrix(format!(
                "cost and column index arrays must have the same length, found {} and {}",
                costs.len(),
                col_index.len()
            )));
        }
        let total: usize = row_count.iter().sum();
        if total != costs.len() {
            return Err(TrackingError::MalformedMatrix(format!(
                "row counts sum to {total} but {} costs were provided",
                costs.len()
            )));
        }

        let mut row_start = Vec::with_capacity(row_count.len());
        let mut offset = 0;
        for (row, &count) in row_count.iter().enumerate() {
            row_start.push(offset);
            let mut previous: Option<usize> = None;
            for k in offset..offset + count {
                let col = col_index[k];
                if col >= n_cols {
                    return Err(TrackingError::MalformedMatrix(format!(
                        "row {row} has column index {col}, but the matrix has {n_cols} columns"
                    )));
                }
                if previous.is_some_and(|p| col <= p) {
                    return Err(TrackingError::MalformedMatrix(format!(
                        "column indices of row {row} are not strictly increasing"
                    )));
                }
                previous = Some(col);
            }
            offset += count;
        }

        Ok(Self {
            costs,
            col_index,
            row_start,
            row_count,
            n_cols,
        })
    }

    /// An empty matrix: the "nothing to link" value.
    pub fn empty() -> Self {
        Self {
            costs: Vec::new(),
            col_index: Vec::new(),
            row_start: Vec::new(),
            row_count: Vec::new(),
            n_cols: 0,
        }
    }

    /// A square `n × n` matrix holding `value` on its diagonal and nothing
    /// elsewhere. Used for the alternative-cost quadrants.
    pub fn diagonal(n: usize, value: f64) -> Self {
        Self {
            costs: vec![value; n],
            col_index: (0..n).collect(),
            row_start: (0..n).collect(),
            row_count: vec![1; n],
            n_cols: n,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.row_count.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored (admissible) entries.
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.costs.len()
    }

    /// The stored entries `(column, cost)` of one row, columns ascending.
    #[inline]
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.row_start[row];
        let end = start + self.row_count[row];
        self.col_index[start..end]
            .iter()
            .zip(&self.costs[start..end])
            .map(|(&col, &cost)| (col, cost))
    }

    #[inline]
    pub fn row_len(&self, row: usize) -> usize {
        self.row_count[row]
    }

    /// All stored costs, row by row.
    #[inline]
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// The stored value at `(row, col)`, or `None` if that assignment is
    /// forbidden. Binary search within the row's slice.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let start = self.row_start[row];
        let end = start + self.row_count[row];
        self.col_index[start..end]
            .binary_search(&col)
            .ok()
            .map(|k| self.costs[start + k])
    }

    /// Total cost of a row assignment. Rows assigned to an absent column
    /// contribute nothing (the assignment is invalid for them anyway).
    pub fn total_assignment_cost(&self, assignment: &[Option<usize>]) -> f64 {
        assignment
            .iter()
            .enumerate()
            .filter_map(|(row, &col)| col.and_then(|c| self.get(row, c)))
            .sum()
    }

    /// The transpose of this matrix.
    pub fn transpose(&self) -> SparseCostMatrix {
        let mut counts = vec![0usize; self.n_cols];
        for &col in &self.col_index {
            counts[col] += 1;
        }
        let mut starts = vec![0usize; self.n_cols];
        let mut offset = 0;
        for (col, &count) in counts.iter().enumerate() {
            starts[col] = offset;
            offset += count;
        }

        let mut costs = vec![0.0; self.cardinality()];
        let mut col_index = vec![0usize; self.cardinality()];
        let mut cursor = starts.clone();
        // Rows are visited in ascending order, so each output row (former
        // column) receives its column indices already sorted.
        for row in 0..self.n_rows() {
            for (col, cost) in self.row(row) {
                let k = cursor[col];
                costs[k] = cost;
                col_index[k] = row;
                cursor[col] += 1;
            }
        }

        SparseCostMatrix {
            costs,
            col_index,
            row_start: starts,
            row_count: counts,
            n_cols: self.n_rows(),
        }
    }

    /// Horizontal concatenation `[ self | other ]`. Both matrices must have
    /// the same number of rows.
    pub fn hcat(&self, other: &SparseCostMatrix) -> Result<SparseCostMatrix, TrackingError> {
        if self.n_rows() != other.n_rows() {
            return Err(TrackingError::MalformedMatrix(format!(
                "cannot concatenate horizontally: {} rows vs {} rows",
                self.n_rows(),
                other.n_rows()
            )));
        }

        let cardinality = self.cardinality() + other.cardinality();
        let mut costs = Vec::with_capacity(cardinality);
        let mut col_index = Vec::with_capacity(cardinality);
        let mut row_count = Vec::with_capacity(self.n_rows());
        for row in 0..self.n_rows() {
            for (col, cost) in self.row(row) {
                col_index.push(col);
                costs.push(cost);
            }
            // Columns of the right block are shifted past ours, which keeps
            // each merged row sorted.
            for (col, cost) in other.row(row) {
                col_index.push(col + self.n_cols);
                costs.push(cost);
            }
            row_count.push(self.row_count[row] + other.row_count[row]);
        }

        SparseCostMatrix::new(costs, col_index, row_count, self.n_cols + other.n_cols)
    }

    /// Vertical concatenation `[ self / other ]`. Both matrices must have
    /// the same number of columns.
    pub fn vcat(&self, other: &SparseCostMatrix) -> Result<SparseCostMatrix, TrackingError> {
        if self.n_cols != other.n_cols {
            return Err(TrackingError::MalformedMatrix(format!(
                "cannot concatenate vertically: {} columns vs {} columns",
                self.n_cols, other.n_cols
            )));
        }

        let mut costs = self.costs.clone();
        costs.extend_from_slice(&other.costs);
        let mut col_index = self.col_index.clone();
        col_index.extend_from_slice(&other.col_index);
        let mut row_count = self.row_count.clone();
        row_count.extend_from_slice(&other.row_count);

        SparseCostMatrix::new(costs, col_index, row_count, self.n_cols)
    }

    /// A copy of this matrix with every stored value replaced by `value`.
    /// The sparsity pattern is unchanged.
    pub fn fill_with(&self, value: f64) -> SparseCostMatrix {
        SparseCostMatrix {
            costs: vec![value; self.cardinality()],
            col_index: self.col_index.clone(),
            row_start: self.row_start.clone(),
            row_count: self.row_count.clone(),
            n_cols: self.n_cols,
        }
    }

    /// Dense copy with `f64::INFINITY` for forbidden assignments. Test and
    /// debugging aid; never used on large instances.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![f64::INFINITY; self.n_cols]; self.n_rows()];
        for row in 0..self.n_rows() {
            for (col, cost) in self.row(row) {
                dense[row][col] = cost;
            }
        }
        dense
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
