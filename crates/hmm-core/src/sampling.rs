//! Generative sampling from a trained model.

use hmm_math::sample_index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::model::HmmModel;

/// A sampled hidden path and the symbols it emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledSequence {
    pub states: Vec<usize>,
    pub symbols: Vec<usize>,
}

/// Draw one sequence of `length` steps.
///
/// The first state comes from `Pi`, each following state from the row of
/// `A` for the current state, and each symbol from the row of `B`.
pub fn sample_sequence<R: Rng + ?Sized>(
    model: &HmmModel,
    length: usize,
    rng: &mut R,
) -> SampledSequence {
    let mut states = Vec::with_capacity(length);
    let mut symbols = Vec::with_capacity(length);

    let mut state = sample_index(model.initial(), rng.random::<f64>());
    for t in 0..length {
        if t > 0 {
            state = sample_index(model.transition().row(state), rng.random::<f64>());
        }
        states.push(state);
        symbols.push(sample_index(model.emission().row(state), rng.random::<f64>()));
    }

    SampledSequence { states, symbols }
}

/// Draw `count` independent sequences of `length` steps as a training corpus.
pub fn sample_corpus<R: Rng + ?Sized>(
    model: &HmmModel,
    count: usize,
    length: usize,
    rng: &mut R,
) -> Result<Corpus> {
    if length == 0 && count > 0 {
        return Err(Error::EmptySequence { sequence: 0 });
    }
    let sequences = (0..count)
        .map(|_| sample_sequence(model, length, rng).symbols)
        .collect();
    Corpus::new(model.n_symbols(), sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn deterministic_model_yields_fixed_path() {
        let model = HmmModel::from_nested(
            &[vec![0.0, 1.0], vec![1.0, 0.0]],
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            &[1.0, 0.0],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let s = sample_sequence(&model, 5, &mut rng);
        assert_eq!(s.states, vec![0, 1, 0, 1, 0]);
        assert_eq!(s.symbols, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let mut rng = StdRng::seed_from_u64(11);
        let model = HmmModel::random(3, 4, &mut rng).unwrap();
        let a = sample_corpus(&model, 4, 20, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = sample_corpus(&model, 4, 20, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert!(a.iter().all(|s| s.len() == 20));
    }

    #[test]
    fn empirical_frequencies_follow_emissions() {
        let model = HmmModel::from_nested(&[vec![1.0]], &[vec![0.2, 0.8]], &[1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let corpus = sample_corpus(&model, 1, 20_000, &mut rng).unwrap();
        let counts = corpus.symbol_counts();
        let freq = counts[1] as f64 / 20_000.0;
        assert!((freq - 0.8).abs() < 0.02, "freq = {freq}");
    }

    #[test]
    fn zero_length_is_rejected() {
        let model = HmmModel::from_nested(&[vec![1.0]], &[vec![1.0]], &[1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_corpus(&model, 2, 0, &mut rng).is_err());
        assert!(sample_corpus(&model, 0, 0, &mut rng).unwrap().is_empty());
    }
}
