//! Row-major dense matrix used for model parameters and per-sequence tables.
//!
//! The buffer is reused across `resize` calls so per-sequence tables
//! (alpha, beta, gamma) do not reallocate once they reach their peak size.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Dense `rows x cols` matrix of `f64` stored in a single row-major buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Matrix of the given shape filled with zeros.
    ///
    /// # Panics
    ///
    /// When `rows * cols` overflows `usize`. Use [`Matrix::try_zeros`] for
    /// shapes that come from untrusted input.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Matrix of the given shape filled with zeros, or `None` when the
    /// element count overflows `usize`.
    pub fn try_zeros(rows: usize, cols: usize) -> Option<Self> {
        Self::try_filled(rows, cols, 0.0)
    }

    /// Matrix of the given shape filled with `value`.
    ///
    /// # Panics
    ///
    /// When `rows * cols` overflows `usize`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        match Self::try_filled(rows, cols, value) {
            Some(m) => m,
            None => panic!("matrix shape {rows}x{cols} overflows usize"),
        }
    }

    /// Matrix of the given shape filled with `value`, or `None` when the
    /// element count overflows `usize`.
    pub fn try_filled(rows: usize, cols: usize, value: f64) -> Option<Self> {
        let len = rows.checked_mul(cols)?;
        Some(Self {
            rows,
            cols,
            data: vec![value; len],
        })
    }

    /// Wrap a row-major buffer. Returns `None` when `data.len() != rows * cols`
    /// or the product overflows.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Build from nested rows. Returns `None` for ragged input.
    ///
    /// An empty slice yields a `0 x 0` matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Some(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row(&self, r: usize) -> &[f64] {
        debug_assert!(r < self.rows, "row {} out of bounds ({})", r, self.rows);
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        debug_assert!(r < self.rows, "row {} out of bounds ({})", r, self.rows);
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Borrow rows `upper` and `upper + 1` mutably at the same time.
    ///
    /// Recurrences read one row while writing its neighbour; this avoids
    /// copying the row being read.
    pub fn adjacent_rows_mut(&mut self, upper: usize) -> (&mut [f64], &mut [f64]) {
        debug_assert!(upper + 1 < self.rows);
        let cols = self.cols;
        let (head, tail) = self.data[upper * cols..(upper + 2) * cols].split_at_mut(cols);
        (head, tail)
    }

    /// Iterate over rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |r| self.row(r))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Set every entry to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Change the shape in place and zero the contents, keeping the allocation.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, 0.0);
    }

    /// Element-wise `self += other`. Shapes must match.
    pub fn add_assign(&mut self, other: &Matrix) {
        assert_eq!(self.shape(), other.shape(), "matrix shape mismatch");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += *b;
        }
    }

    /// Copy into nested `Vec`s (used for serialization to `[[..], ..]`).
    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        debug_assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        debug_assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        &mut self.data[r * self.cols + c]
    }
}
