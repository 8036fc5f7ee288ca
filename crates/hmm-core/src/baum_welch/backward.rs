//! Scaled backward recursion.

use hmm_math::Matrix;

use super::forward::ScalingFactors;
use crate::error::Result;
use crate::model::HmmModel;

/// Run the scaled backward pass, writing the T×N beta table into `beta`.
///
/// Uses the forward pass's own factors: `beta[T-1][i] = c[T-1]` and
/// `beta[t][i] = c[t] * sum_j A[i][j] B[j][obs[t+1]] beta[t+1][j]`.
/// Factors from another sequence or another model are rejected with
/// [`crate::Error::ScalingMismatch`].
pub fn backward(
    model: &HmmModel,
    obs: &[usize],
    scaling: &ScalingFactors,
    beta: &mut Matrix,
) -> Result<()> {
    scaling.check_pairing(model, obs)?;

    let n = model.n_states();
    let t_len = obs.len();
    beta.resize(t_len, n);
    if t_len == 0 {
        return Ok(());
    }

    let a = model.transition();
    let b = model.emission();
    let c = scaling.factors();

    beta.row_mut(t_len - 1).fill(c[t_len - 1]);

    for t in (0..t_len - 1).rev() {
        let symbol = obs[t + 1];
        let (cur, next) = beta.adjacent_rows_mut(t);
        for (i, cell) in cur.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (j, &bn) in next.iter().enumerate() {
                acc += a[(i, j)] * b[(j, symbol)] * bn;
            }
            *cell = c[t] * acc;
        }
    }

    Ok(())
}
