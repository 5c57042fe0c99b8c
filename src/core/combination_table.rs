use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::error::{GraphError, GraphResult};

/// An immutable tabular factor: an enumerated set of joint assignments with a
/// nonnegative weight per row.
///
/// `rows[r][i]` is the index into the alphabet of the i-th incident variable
/// for row `r`; `weights[r]` is that row's nonnegative weight. Row order is
/// the authoritative enumeration order for [`crate::core::FactorNode`]
/// updates; duplicate rows are permitted and contribute additively.
#[derive(Debug, Clone)]
pub struct CombinationTable {
    rows: Array2<usize>,
    weights: Array1<f64>,
}

impl CombinationTable {
    /// Builds a table from a `[rows x arity]` assignment matrix and a
    /// matching weight per row.
    ///
    /// Fails with [`GraphError::Shape`] if `weights.len() != rows.nrows()`,
    /// or [`GraphError::InvalidWeight`] if any weight is negative, NaN, or
    /// infinite.
    pub fn new(rows: ArrayView2<usize>, weights: ArrayView1<f64>) -> GraphResult<Self> {
        if weights.len() != rows.nrows() {
            return Err(GraphError::Shape {
                expected: rows.nrows(),
                got: weights.len(),
            });
        }
        for (r, &w) in weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(GraphError::InvalidWeight { row: r, weight: w });
            }
        }
        Ok(CombinationTable {
            rows: rows.to_owned(),
            weights: weights.to_owned(),
        })
    }

    /// Number of incident variables (columns of the assignment matrix).
    #[inline]
    pub fn arity(&self) -> usize {
        self.rows.ncols()
    }

    /// Number of rows in the table.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.nrows()
    }

    /// The assignment of row `r`.
    #[inline]
    pub fn row(&self, r: usize) -> ArrayView1<usize> {
        self.rows.row(r)
    }

    /// The weight of row `r`.
    #[inline]
    pub fn weight(&self, r: usize) -> f64 {
        self.weights[r]
    }
}
