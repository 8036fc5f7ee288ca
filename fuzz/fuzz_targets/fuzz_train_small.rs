//! Fuzz target for a short training run on small models.
//!
//! Supplied parameters may contain zeros, which drives the epsilon floor.
//! Training must run to the configured count without panicking.

#![no_main]

use arbitrary::Arbitrary;
use hmm_core::{train, Corpus, HmmModel, TrainingConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct SmallRun {
    n: u8,
    m: u8,
    weights: Vec<u8>,
    sequences: Vec<Vec<u8>>,
    iterations: u8,
}

fn rows(weights: &mut impl Iterator<Item = u8>, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|_| {
            let raw: Vec<f64> = (0..cols).map(|_| f64::from(weights.next().unwrap_or(1))).collect();
            let sum: f64 = raw.iter().sum();
            if sum > 0.0 {
                raw.iter().map(|w| w / sum).collect()
            } else {
                vec![1.0 / cols as f64; cols]
            }
        })
        .collect()
}

fuzz_target!(|run: SmallRun| {
    let n = usize::from(run.n % 4) + 1;
    let m = usize::from(run.m % 4) + 1;
    let sequences: Vec<Vec<usize>> = run
        .sequences
        .iter()
        .take(4)
        .filter(|seq| !seq.is_empty())
        .map(|seq| seq.iter().take(32).map(|&s| usize::from(s) % m).collect())
        .collect();
    let Ok(corpus) = Corpus::new(m, sequences) else {
        return;
    };

    let mut weights = run.weights.into_iter().cycle().take(n * n + n * m + n);
    let a = rows(&mut weights, n, n);
    let b = rows(&mut weights, n, m);
    let pi = rows(&mut weights, 1, n).remove(0);
    let Ok(model) = HmmModel::from_nested(&a, &b, &pi) else {
        return;
    };

    let iterations = usize::from(run.iterations % 5) + 1;
    let config = TrainingConfig::default().with_max_iterations(iterations);
    if let Ok(outcome) = train(&corpus, model, config) {
        assert_eq!(outcome.history.len(), iterations);
        assert_eq!(outcome.model.n_states(), n);
    }
});
