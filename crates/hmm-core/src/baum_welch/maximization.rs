//! M-step: re-estimate the model from one iteration's statistics.

use hmm_math::Matrix;

use super::expectation::Accumulators;
use crate::model::HmmModel;

/// Parameters produced by one M-step.
#[derive(Debug, Clone, PartialEq)]
pub struct Reestimated {
    pub transition: Matrix,
    pub emission: Matrix,
    pub initial: Vec<f64>,
    /// Rows of `A`, `B` or `Pi` copied from the previous model because their
    /// denominator did not exceed epsilon.
    pub carried_rows: usize,
}

/// Re-estimate `A`, `B` and `Pi`.
///
/// `Pi[i] = numer_pi[i] / K`, `A[i][j] = numer_a[i][j] / (denom_a[i] + eps)`,
/// `B[i][k] = numer_b[i][k] / (denom_b[i] + eps)`. A row whose denominator
/// is at most `epsilon` carries no evidence; it keeps the row of `previous`
/// so the result stays row-stochastic. `Pi` is treated the same way when its
/// numerators sum to at most `epsilon`. Returns `None` when no sequence was
/// folded (K = 0).
pub fn maximize(acc: &Accumulators, previous: &HmmModel, epsilon: f64) -> Option<Reestimated> {
    if acc.sequences == 0 {
        return None;
    }
    let k = acc.sequences as f64;
    let mut carried_rows = 0;

    let initial = if acc.numer_pi.iter().sum::<f64>() <= epsilon {
        carried_rows += 1;
        previous.initial().to_vec()
    } else {
        acc.numer_pi.iter().map(|v| v / k).collect()
    };
    let transition = reestimate_rows(
        &acc.numer_a,
        &acc.denom_a,
        previous.transition(),
        epsilon,
        &mut carried_rows,
    );
    let emission = reestimate_rows(
        &acc.numer_b,
        &acc.denom_b,
        previous.emission(),
        epsilon,
        &mut carried_rows,
    );

    Some(Reestimated {
        transition,
        emission,
        initial,
        carried_rows,
    })
}

fn reestimate_rows(
    numer: &Matrix,
    denom: &[f64],
    previous: &Matrix,
    epsilon: f64,
    carried_rows: &mut usize,
) -> Matrix {
    let (rows, cols) = numer.shape();
    let mut out = Matrix::zeros(rows, cols);
    for (i, &d) in denom.iter().enumerate() {
        let row = out.row_mut(i);
        if d <= epsilon {
            row.copy_from_slice(previous.row(i));
            *carried_rows += 1;
            continue;
        }
        let inv = 1.0 / (d + epsilon);
        for (dst, &n) in row.iter_mut().zip(numer.row(i)) {
            *dst = n * inv;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baum_welch::expectation::SequenceWorkspace;

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
    fn empty_accumulators_yield_nothing() {
        let acc = Accumulators::new(2, 2);
        assert!(maximize(&acc, &model(), EPS).is_none());
    }

    #[test]
    fn reestimated_rows_are_stochastic() {
        let model = model();
        let mut acc = Accumulators::new(2, 2);
        let mut ws = SequenceWorkspace::new();
        acc.accumulate_sequence(&model, &[0, 1, 0, 1, 0], EPS, &mut ws)
            .unwrap();
        acc.accumulate_sequence(&model, &[1, 1], EPS, &mut ws).unwrap();

        let next = maximize(&acc, &model, EPS).unwrap();
        assert_eq!(next.carried_rows, 0);
        for row in next.transition.iter_rows().chain(next.emission.iter_rows()) {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!((next.initial.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rows_without_evidence_are_carried() {
        // Only length-1 sequences: no transition evidence at all.
        let model = model();
        let mut acc = Accumulators::new(2, 2);
        let mut ws = SequenceWorkspace::new();
        acc.accumulate_sequence(&model, &[0], EPS, &mut ws).unwrap();

        let next = maximize(&acc, &model, EPS).unwrap();
        assert_eq!(next.carried_rows, 2);
        assert_eq!(&next.transition, model.transition());
        for row in next.emission.iter_rows() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn initial_without_evidence_is_carried() {
        // Every state assigns zero probability to the sequence, so gamma is zero.
        let model = HmmModel::from_nested(
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0], vec![0.5, 0.5]],
            &[1.0, 0.0],
        )
        .unwrap();
        let mut acc = Accumulators::new(2, 2);
        let mut ws = SequenceWorkspace::new();
        acc.accumulate_sequence(&model, &[1, 1], EPS, &mut ws).unwrap();
        assert!(acc.numer_pi.iter().sum::<f64>() <= EPS);

        let next = maximize(&acc, &model, EPS).unwrap();
        assert_eq!(next.initial, model.initial());
        assert!(next.carried_rows >= 1);
    }
}
