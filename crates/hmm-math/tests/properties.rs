//! Property-based tests for hmm-math numerical helpers.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use hmm_math::{
    is_distribution, l1_normalize, log_sum_exp, max_row_deviation, sample_index, Matrix,
};
use proptest::prelude::*;

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-10;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

// ============================================================================
// log_sum_exp properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// log_sum_exp is commutative: order doesn't matter.
    #[test]
    fn log_sum_exp_commutative(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        let ab = log_sum_exp(&[a, b]);
        let ba = log_sum_exp(&[b, a]);
        prop_assert!(approx_eq(ab, ba, TOL), "lse([{},{}])={} != {}", a, b, ab, ba);
    }

    /// log_sum_exp matches the naive formula where the naive one does not overflow.
    #[test]
    fn log_sum_exp_matches_naive(values in prop::collection::vec(-30.0..30.0f64, 1..8)) {
        let naive = values.iter().map(|v| v.exp()).sum::<f64>().ln();
        prop_assert!(approx_eq(log_sum_exp(&values), naive, TOL));
    }

    /// No underflow with very negative values (forward log-probabilities of long sequences).
    #[test]
    fn log_sum_exp_no_underflow(a in -5000.0..-1000.0f64, b in -5000.0..-1000.0f64) {
        let result = log_sum_exp(&[a, b]);
        prop_assert!(result.is_finite());
        prop_assert!(result >= a.max(b) - TOL);
        prop_assert!(result <= a.max(b) + 2.0f64.ln() + TOL);
    }
}

// ============================================================================
// Stochastic vector properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Normalizing any positive vector yields a distribution.
    #[test]
    fn l1_normalize_yields_distribution(mut values in prop::collection::vec(1e-6..1e6f64, 1..32)) {
        prop_assert!(l1_normalize(&mut values));
        prop_assert!(is_distribution(&values, 1e-9));
    }

    /// Normalized rows make a row-stochastic matrix.
    #[test]
    fn normalized_rows_have_no_deviation(
        rows in 1usize..6,
        cols in 1usize..6,
        seed in prop::collection::vec(0.01..1.0f64, 36),
    ) {
        let mut m = Matrix::zeros(rows, cols);
        for r in 0..rows {
            let row = m.row_mut(r);
            row.copy_from_slice(&seed[r * cols..(r + 1) * cols]);
            l1_normalize(row);
        }
        prop_assert!(max_row_deviation(&m) < 1e-12);
    }

    /// Sampling always returns an in-range index.
    #[test]
    fn sample_index_in_range(
        mut probs in prop::collection::vec(0.0..1.0f64, 1..10),
        u in 0.0..1.0f64,
    ) {
        probs[0] += 0.1;
        l1_normalize(&mut probs);
        let idx = sample_index(&probs, u);
        prop_assert!(idx < probs.len());
    }
}
