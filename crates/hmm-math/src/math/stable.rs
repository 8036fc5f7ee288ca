//! Numerically stable log-domain primitives.

/// Smallest probability passed to `ln` by [`ln_floored`] callers.
pub const LOG_PROB_FLOOR: f64 = 1e-300;

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Stable log(exp(a) + exp(b)).
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    hi + (lo - hi).exp().ln_1p()
}

/// Natural log with the argument clamped below at `floor`.
///
/// Zero probabilities map to `ln(floor)` instead of -inf so a single
/// impossible event does not poison a whole log-space recursion.
pub fn ln_floored(p: f64, floor: f64) -> f64 {
    p.max(floor).ln()
}
