//! Property-based tests for the Baum-Welch trainer.
//!
//! Random models and corpora are drawn from a seeded `StdRng` so failures
//! shrink to a reproducible (shape, seed) pair.

use hmm_core::{
    forward, posterior_table, train, Corpus, HmmModel, Matrix, TrainingConfig,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-9;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

fn random_corpus(rng: &mut StdRng, m: usize, k: usize, max_len: usize) -> Corpus {
    let sequences = (0..k)
        .map(|_| {
            let t = rng.random_range(1..=max_len);
            (0..t).map(|_| rng.random_range(0..m)).collect()
        })
        .collect();
    Corpus::new(m, sequences).unwrap()
}

fn setup(n: usize, m: usize, k: usize, max_len: usize, seed: u64) -> (HmmModel, Corpus) {
    let mut rng = StdRng::seed_from_u64(seed);
    let model = HmmModel::random(n, m, &mut rng).unwrap();
    let corpus = random_corpus(&mut rng, m, k, max_len);
    (model, corpus)
}

/// P(O) by summing over every hidden path.
fn brute_force_probability(model: &HmmModel, obs: &[usize]) -> f64 {
    let n = model.n_states();
    let paths = n.pow(obs.len() as u32);
    let mut total = 0.0;
    for code in 0..paths {
        let mut rest = code;
        let mut prev = None;
        let mut p = 1.0;
        for &o in obs {
            let s = rest % n;
            rest /= n;
            p *= match prev {
                None => model.initial()[s],
                Some(q) => model.transition().row(q)[s],
            };
            p *= model.emission().row(s)[o];
            prev = Some(s);
        }
        total += p;
    }
    total
}

/// Unscaled forward table by direct recursion.
fn unscaled_forward(model: &HmmModel, obs: &[usize]) -> Vec<Vec<f64>> {
    let n = model.n_states();
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(obs.len());
    for (t, &o) in obs.iter().enumerate() {
        let row = (0..n)
            .map(|j| {
                let prior = if t == 0 {
                    model.initial()[j]
                } else {
                    (0..n)
                        .map(|i| rows[t - 1][i] * model.transition().row(i)[j])
                        .sum()
                };
                prior * model.emission().row(j)[o]
            })
            .collect();
        rows.push(row);
    }
    rows
}

// ============================================================================
// Stochasticity and posteriors
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every iteration leaves A, B and Pi row-stochastic.
    #[test]
    fn model_stays_stochastic(
        n in 1usize..5,
        m in 1usize..5,
        k in 1usize..4,
        iterations in 1usize..6,
        seed in any::<u64>(),
    ) {
        let (model, corpus) = setup(n, m, k, 12, seed);
        let config = TrainingConfig::default().with_max_iterations(iterations);
        let outcome = train(&corpus, model, config).unwrap();
        prop_assert!(outcome.model.check_stochastic(TOL).is_ok(),
            "deviation {}", outcome.model.stochastic_deviation());
        prop_assert_eq!(outcome.history.len(), iterations);
    }

    /// Each row of the posterior table sums to one.
    #[test]
    fn gamma_rows_sum_to_one(
        n in 1usize..5,
        m in 1usize..5,
        seed in any::<u64>(),
    ) {
        let (model, corpus) = setup(n, m, 1, 30, seed);
        let gamma = posterior_table(&model, corpus.iter().next().unwrap(), 1e-100).unwrap();
        for row in gamma.iter_rows() {
            let sum: f64 = row.iter().sum();
            prop_assert!(approx_eq(sum, 1.0, TOL), "row sums to {}", sum);
            prop_assert!(row.iter().all(|&g| (0.0..=1.0 + TOL).contains(&g)));
        }
    }

    /// EM never decreases the corpus log-likelihood.
    #[test]
    fn log_likelihood_is_monotone(
        n in 1usize..4,
        m in 1usize..4,
        k in 1usize..4,
        seed in any::<u64>(),
    ) {
        let (model, corpus) = setup(n, m, k, 15, seed);
        let config = TrainingConfig::default().with_max_iterations(12);
        let outcome = train(&corpus, model, config).unwrap();
        prop_assert!(outcome.history.is_non_decreasing(1e-9),
            "history: {:?}", outcome.history.log_likelihoods().collect::<Vec<_>>());
    }
}

// ============================================================================
// Scaling consistency
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Undoing the scale factors recovers the unscaled forward table.
    #[test]
    fn scaled_forward_matches_brute_force(
        n in 1usize..4,
        m in 1usize..4,
        seed in any::<u64>(),
    ) {
        let (model, corpus) = setup(n, m, 1, 5, seed);
        let obs = corpus.iter().next().unwrap();

        let mut alpha = Matrix::default();
        let scaling = forward(&model, obs, 1e-100, &mut alpha);
        let expected = unscaled_forward(&model, obs);

        let mut product = 1.0;
        for (t, &c) in scaling.factors().iter().enumerate() {
            product *= c;
            for i in 0..n {
                let recovered = alpha.row(t)[i] / product;
                prop_assert!(approx_eq(recovered, expected[t][i], 1e-9),
                    "t={} i={}: {} vs {}", t, i, recovered, expected[t][i]);
            }
        }

        let p = brute_force_probability(&model, obs);
        prop_assert!(approx_eq(scaling.log_likelihood(), p.ln(), 1e-9),
            "{} vs {}", scaling.log_likelihood(), p.ln());
    }
}
