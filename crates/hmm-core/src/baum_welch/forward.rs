//! Scaled forward recursion.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hmm_math::Matrix;

use crate::error::{Error, Result};
use crate::model::HmmModel;

/// Per-step scaling factors `c[t]` of one forward pass.
///
/// The factors are bound to the sequence and model parameters they were
/// computed from; [`super::backward`] refuses factors from any other pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingFactors {
    factors: Vec<f64>,
    near_zero_steps: usize,
    pairing: u64,
}

impl ScalingFactors {
    /// The factors, one per time step.
    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Sequence log-likelihood, `-sum(ln c[t])`.
    pub fn log_likelihood(&self) -> f64 {
        -self.factors.iter().map(|c| c.ln()).sum::<f64>()
    }

    /// Steps whose unscaled column sum did not exceed epsilon.
    pub fn near_zero_steps(&self) -> usize {
        self.near_zero_steps
    }

    /// Fail unless these factors came from a forward pass over `obs` under `model`.
    pub fn check_pairing(&self, model: &HmmModel, obs: &[usize]) -> Result<()> {
        if self.factors.len() != obs.len() {
            return Err(Error::ScalingMismatch(format!(
                "{} factors for a sequence of length {}",
                self.factors.len(),
                obs.len()
            )));
        }
        if self.pairing != pairing_key(model, obs) {
            return Err(Error::ScalingMismatch(
                "factors were computed for a different sequence or model".into(),
            ));
        }
        Ok(())
    }
}

/// Hash of the observation symbols and the exact parameter bits.
fn pairing_key(model: &HmmModel, obs: &[usize]) -> u64 {
    let mut hasher = DefaultHasher::new();
    obs.hash(&mut hasher);
    for v in model
        .transition()
        .as_slice()
        .iter()
        .chain(model.emission().as_slice())
        .chain(model.initial())
    {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Run the scaled forward pass, writing the T×N alpha table into `alpha`.
///
/// Every row of `alpha` is rescaled by `c[t] = 1 / (sum + epsilon)` and so
/// sums to (nearly) one. Symbols must lie in `[0, M)` for `model`.
pub fn forward(model: &HmmModel, obs: &[usize], epsilon: f64, alpha: &mut Matrix) -> ScalingFactors {
    let n = model.n_states();
    let t_len = obs.len();
    alpha.resize(t_len, n);

    let mut factors = Vec::with_capacity(t_len);
    let mut near_zero_steps = 0;

    if let Some(&first) = obs.first() {
        let a = model.transition();
        let b = model.emission();
        let pi = model.initial();

        let row = alpha.row_mut(0);
        for (i, cell) in row.iter_mut().enumerate() {
            *cell = pi[i] * b[(i, first)];
        }
        factors.push(rescale(row, epsilon, &mut near_zero_steps));

        for t in 1..t_len {
            let symbol = obs[t];
            let (prev, cur) = alpha.adjacent_rows_mut(t - 1);
            for (j, cell) in cur.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (i, &p) in prev.iter().enumerate() {
                    acc += p * a[(i, j)];
                }
                *cell = acc * b[(j, symbol)];
            }
            factors.push(rescale(cur, epsilon, &mut near_zero_steps));
        }
    }

    ScalingFactors {
        factors,
        near_zero_steps,
        pairing: pairing_key(model, obs),
    }
}

fn rescale(row: &mut [f64], epsilon: f64, near_zero_steps: &mut usize) -> f64 {
    let sum: f64 = row.iter().sum();
    if sum <= epsilon {
        *near_zero_steps += 1;
    }
    let c = 1.0 / (sum + epsilon);
    for v in row.iter_mut() {
        *v *= c;
    }
    c
}
