//! E-step: state posteriors and corpus-wide sufficient statistics.

use hmm_math::Matrix;

use super::backward::backward;
use super::forward::{forward, ScalingFactors};
use crate::error::{Error, Result};
use crate::model::HmmModel;

/// Running numerators and denominators of one EM iteration.
///
/// Sequences are folded in by pure addition, so accumulators built on
/// different workers can be [`merge`](Accumulators::merge)d in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulators {
    /// Sum of `gamma[0][i]` over sequences.
    pub numer_pi: Vec<f64>,
    /// Sum of `xi[t][i][j]` over `t < T-1`.
    pub numer_a: Matrix,
    /// Sum of `gamma[t][i]` over `t < T-1`.
    pub denom_a: Vec<f64>,
    /// Sum of `gamma[t][i]` over steps where `obs[t] == k`.
    pub numer_b: Matrix,
    /// Sum of `gamma[t][i]` over all steps.
    pub denom_b: Vec<f64>,
    /// Sequences folded so far (K).
    pub sequences: usize,
    /// Corpus log-likelihood under the model the statistics were taken from.
    pub log_likelihood: f64,
    /// Forward sums and xi denominators that did not exceed epsilon.
    pub near_zero_denominators: usize,
}

impl Accumulators {
    pub fn new(n_states: usize, n_symbols: usize) -> Self {
        Self {
            numer_pi: vec![0.0; n_states],
            numer_a: Matrix::zeros(n_states, n_states),
            denom_a: vec![0.0; n_states],
            numer_b: Matrix::zeros(n_states, n_symbols),
            denom_b: vec![0.0; n_states],
            sequences: 0,
            log_likelihood: 0.0,
            near_zero_denominators: 0,
        }
    }

    pub fn n_states(&self) -> usize {
        self.numer_pi.len()
    }

    pub fn n_symbols(&self) -> usize {
        self.numer_b.cols()
    }

    /// Zero every statistic, keeping allocations.
    pub fn reset(&mut self) {
        self.numer_pi.fill(0.0);
        self.numer_a.fill(0.0);
        self.denom_a.fill(0.0);
        self.numer_b.fill(0.0);
        self.denom_b.fill(0.0);
        self.sequences = 0;
        self.log_likelihood = 0.0;
        self.near_zero_denominators = 0;
    }

    /// Add another accumulator of the same shape into this one.
    pub fn merge(&mut self, other: &Accumulators) {
        add_into(&mut self.numer_pi, &other.numer_pi);
        self.numer_a.add_assign(&other.numer_a);
        add_into(&mut self.denom_a, &other.denom_a);
        self.numer_b.add_assign(&other.numer_b);
        add_into(&mut self.denom_b, &other.denom_b);
        self.sequences += other.sequences;
        self.log_likelihood += other.log_likelihood;
        self.near_zero_denominators += other.near_zero_denominators;
    }

    /// Forward, backward and fold for one sequence.
    ///
    /// Returns the sequence log-likelihood.
    pub fn accumulate_sequence(
        &mut self,
        model: &HmmModel,
        obs: &[usize],
        epsilon: f64,
        workspace: &mut SequenceWorkspace,
    ) -> Result<f64> {
        let scaling = forward(model, obs, epsilon, &mut workspace.alpha);
        backward(model, obs, &scaling, &mut workspace.beta)?;
        self.fold_sequence(model, obs, &scaling, workspace, epsilon)?;
        Ok(scaling.log_likelihood())
    }

    /// Fold gamma and xi of one sequence whose alpha and beta tables are
    /// already in `workspace`.
    pub fn fold_sequence(
        &mut self,
        model: &HmmModel,
        obs: &[usize],
        scaling: &ScalingFactors,
        workspace: &mut SequenceWorkspace,
        epsilon: f64,
    ) -> Result<()> {
        let n = self.n_states();
        let t_len = obs.len();
        if model.n_states() != n || model.n_symbols() != self.n_symbols() {
            return Err(Error::ShapeMismatch {
                name: "accumulators",
                expected: format!("{}x{}", model.n_states(), model.n_symbols()),
                actual: format!("{}x{}", n, self.n_symbols()),
            });
        }
        if workspace.alpha.shape() != (t_len, n) || workspace.beta.shape() != (t_len, n) {
            return Err(Error::ScalingMismatch(format!(
                "alpha/beta tables do not cover a sequence of length {t_len}"
            )));
        }
        scaling.check_pairing(model, obs)?;
        if t_len == 0 {
            return Ok(());
        }

        state_posteriors(&workspace.alpha, &workspace.beta, epsilon, &mut workspace.gamma);
        let gamma = &workspace.gamma;
        let alpha = &workspace.alpha;
        let beta = &workspace.beta;
        let a = model.transition();
        let b = model.emission();

        for (acc, &g) in self.numer_pi.iter_mut().zip(gamma.row(0)) {
            *acc += g;
        }

        let mut near_zero = scaling.near_zero_steps();
        let xi = &mut workspace.xi;
        xi.resize(n, n);
        for t in 0..t_len - 1 {
            let symbol = obs[t + 1];
            let mut denom = 0.0;
            for i in 0..n {
                let at = alpha[(t, i)];
                for j in 0..n {
                    let w = at * a[(i, j)] * b[(j, symbol)] * beta[(t + 1, j)];
                    xi[(i, j)] = w;
                    denom += w;
                }
            }
            if denom <= epsilon {
                near_zero += 1;
            }
            let scale = 1.0 / (denom + epsilon);
            for (acc, &w) in self.numer_a.as_mut_slice().iter_mut().zip(xi.as_slice()) {
                *acc += w * scale;
            }
            for (acc, &g) in self.denom_a.iter_mut().zip(gamma.row(t)) {
                *acc += g;
            }
        }

        for (t, &symbol) in obs.iter().enumerate() {
            for (i, &g) in gamma.row(t).iter().enumerate() {
                self.numer_b[(i, symbol)] += g;
                self.denom_b[i] += g;
            }
        }

        self.sequences += 1;
        self.log_likelihood += scaling.log_likelihood();
        self.near_zero_denominators += near_zero;
        Ok(())
    }
}

/// Scratch tables for one sequence, reused across sequences and iterations.
#[derive(Debug, Clone, Default)]
pub struct SequenceWorkspace {
    alpha: Matrix,
    beta: Matrix,
    gamma: Matrix,
    xi: Matrix,
}

impl SequenceWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alpha(&self) -> &Matrix {
        &self.alpha
    }

    pub fn beta(&self) -> &Matrix {
        &self.beta
    }

    /// Gamma table of the last folded sequence.
    pub fn gamma(&self) -> &Matrix {
        &self.gamma
    }

    pub fn alpha_mut(&mut self) -> &mut Matrix {
        &mut self.alpha
    }

    pub fn beta_mut(&mut self) -> &mut Matrix {
        &mut self.beta
    }
}

/// `gamma[t][i] = alpha[t][i] beta[t][i] / (sum_i alpha[t][i] beta[t][i] + epsilon)`.
pub fn state_posteriors(alpha: &Matrix, beta: &Matrix, epsilon: f64, gamma: &mut Matrix) {
    let (t_len, n) = alpha.shape();
    gamma.resize(t_len, n);
    for t in 0..t_len {
        let (ar, br) = (alpha.row(t), beta.row(t));
        let row = gamma.row_mut(t);
        let mut sum = 0.0;
        for i in 0..n {
            row[i] = ar[i] * br[i];
            sum += row[i];
        }
        let inv = 1.0 / (sum + epsilon);
        for v in row.iter_mut() {
            *v *= inv;
        }
    }
}

/// Gamma table of one sequence under `model`.
pub fn posterior_table(model: &HmmModel, obs: &[usize], epsilon: f64) -> Result<Matrix> {
    let mut ws = SequenceWorkspace::new();
    let scaling = forward(model, obs, epsilon, &mut ws.alpha);
    backward(model, obs, &scaling, &mut ws.beta)?;
    let mut gamma = Matrix::default();
    state_posteriors(&ws.alpha, &ws.beta, epsilon, &mut gamma);
    Ok(gamma)
}

fn add_into(dst: &mut [f64], src: &[f64]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d += *s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-100;

    fn model() -> HmmModel {
        HmmModel::from_nested(
            &[vec![0.7, 0.3], vec![0.4, 0.6]],
            &[vec![0.5, 0.5], vec![0.1, 0.9]],
            &[0.6, 0.4],
        )
        .unwrap()
    }

    #[test]
    fn gamma_rows_sum_to_one() {
        let gamma = posterior_table(&model(), &[0, 1, 0, 1, 0], EPS).unwrap();
        for row in gamma.iter_rows() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn denominators_use_the_right_ranges() {
        let model = model();
        let obs = [0, 1, 1, 0];
        let mut acc = Accumulators::new(2, 2);
        let mut ws = SequenceWorkspace::new();
        acc.accumulate_sequence(&model, &obs, EPS, &mut ws).unwrap();

        // Emission denominators cover all T steps, transitions only T-1.
        let denom_b: f64 = acc.denom_b.iter().sum();
        let denom_a: f64 = acc.denom_a.iter().sum();
        assert!((denom_b - 4.0).abs() < 1e-10);
        assert!((denom_a - 3.0).abs() < 1e-10);

        // Each xi slice sums to one, so numer_a sums to T-1.
        let numer_a: f64 = acc.numer_a.as_slice().iter().sum();
        assert!((numer_a - 3.0).abs() < 1e-10);

        // numer_b row sums match denom_b.
        for i in 0..2 {
            let row: f64 = acc.numer_b.row(i).iter().sum();
            assert!((row - acc.denom_b[i]).abs() < 1e-12);
        }
        assert_eq!(acc.sequences, 1);
    }

    #[test]
    fn single_step_sequence_adds_no_transitions() {
        let mut acc = Accumulators::new(2, 2);
        let mut ws = SequenceWorkspace::new();
        acc.accumulate_sequence(&model(), &[1], EPS, &mut ws).unwrap();

        assert!(acc.numer_a.as_slice().iter().all(|&v| v == 0.0));
        assert!(acc.denom_a.iter().all(|&v| v == 0.0));
        assert!((acc.numer_pi.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((acc.denom_b.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(acc.numer_b.row(0)[0] == 0.0 && acc.numer_b.row(1)[0] == 0.0);
    }

    #[test]
    fn merge_equals_sequential_fold() {
        let model = model();
        let seqs: [&[usize]; 3] = [&[0, 1, 1], &[1, 0], &[0, 0, 1, 1, 0]];
        let mut ws = SequenceWorkspace::new();

        let mut all = Accumulators::new(2, 2);
        for s in seqs {
            all.accumulate_sequence(&model, s, EPS, &mut ws).unwrap();
        }

        let mut left = Accumulators::new(2, 2);
        left.accumulate_sequence(&model, seqs[0], EPS, &mut ws).unwrap();
        let mut right = Accumulators::new(2, 2);
        right.accumulate_sequence(&model, seqs[1], EPS, &mut ws).unwrap();
        right.accumulate_sequence(&model, seqs[2], EPS, &mut ws).unwrap();
        left.merge(&right);

        assert_eq!(left.sequences, 3);
        assert!((left.log_likelihood - all.log_likelihood).abs() < 1e-12);
        for (x, y) in left.numer_a.as_slice().iter().zip(all.numer_a.as_slice()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut acc = Accumulators::new(2, 2);
        let mut ws = SequenceWorkspace::new();
        acc.accumulate_sequence(&model(), &[0, 1], EPS, &mut ws).unwrap();
        acc.reset();
        assert_eq!(acc, Accumulators::new(2, 2));
    }

    #[test]
    fn fold_rejects_stale_tables() {
        let model = model();
        let mut ws = SequenceWorkspace::new();
        let scaling = forward(&model, &[0, 1, 0], EPS, ws.alpha_mut());
        backward(&model, &[0, 1, 0], &scaling, ws.beta_mut()).unwrap();

        let mut acc = Accumulators::new(2, 2);
        let err = acc
            .fold_sequence(&model, &[0, 1], &scaling, &mut ws, EPS)
            .unwrap_err();
        assert!(matches!(err, Error::ScalingMismatch(_)));
    }
}
