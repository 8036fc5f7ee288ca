//! Helpers for probability vectors and row-stochastic matrices.

use super::matrix::Matrix;

/// Scale `values` in place so they sum to 1.
///
/// Returns `false` and leaves the slice untouched when the sum is not a
/// positive finite number.
pub fn l1_normalize(values: &mut [f64]) -> bool {
    let sum: f64 = values.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return false;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
    true
}

/// `|sum(values) - 1|`.
pub fn sum_deviation(values: &[f64]) -> f64 {
    (values.iter().sum::<f64>() - 1.0).abs()
}

/// Whether `values` is a probability vector within `tolerance`.
pub fn is_distribution(values: &[f64], tolerance: f64) -> bool {
    values.iter().all(|&v| v.is_finite() && v >= -tolerance) && sum_deviation(values) <= tolerance
}

/// Largest row-sum deviation from 1 across the matrix (0 for an empty matrix).
pub fn max_row_deviation(m: &Matrix) -> f64 {
    m.iter_rows().map(sum_deviation).fold(0.0, f64::max)
}

/// Whether every row of `m` is a probability vector within `tolerance`.
pub fn is_row_stochastic(m: &Matrix, tolerance: f64) -> bool {
    m.iter_rows().all(|row| is_distribution(row, tolerance))
}

/// Pick an index from a categorical distribution given a uniform draw `u` in [0, 1).
///
/// Walks the cumulative sum; rounding slack at the top end falls to the last
/// index. Returns 0 for an empty slice.
pub fn sample_index(probs: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}
