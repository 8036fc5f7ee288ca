//! The EM loop: a fixed number of Baum-Welch iterations over a corpus.
//!
//! ```text
//! Idle ──step──▶ Iterating ──(iteration == max)──▶ Done
//!                  ▲    │
//!                  └────┘
//! ```
//!
//! Every iteration runs the E-step for each sequence against the current
//! model, appends the corpus log-likelihood to the history, then replaces
//! the model with the M-step result. No convergence threshold is applied.

use std::time::{Duration, Instant};

use hmm_config::trainer::{DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS};
use hmm_config::TrainerConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::expectation::{Accumulators, SequenceWorkspace};
use super::maximization::maximize;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::logging::event_names;
use crate::model::HmmModel;

/// Settings of one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Number of EM iterations to run (at least 1).
    pub max_iterations: usize,
    /// Additive floor applied before every normalizing division.
    pub epsilon: f64,
    /// Fold sequences on the rayon pool when built with `parallel`.
    pub parallel: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            parallel: false,
        }
    }
}

impl TrainingConfig {
    /// Take the `[training]` section of a loaded config file.
    pub fn from_config(config: &TrainerConfig) -> Self {
        Self {
            max_iterations: config.training.max_iterations,
            epsilon: config.training.epsilon,
            parallel: config.training.parallel,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidTrainingOption(
                "max_iterations must be at least 1".into(),
            ));
        }
        hmm_config::validate_epsilon("epsilon", self.epsilon)
            .map_err(|e| Error::InvalidTrainingOption(e.to_string()))
    }
}

/// Lifecycle of a [`Trainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerState {
    Idle,
    Iterating,
    Done,
}

/// One completed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    /// 1-based iteration index.
    pub iter: usize,
    /// Corpus log-likelihood under the model the iteration started from.
    pub log_likelihood: f64,
    pub near_zero_denominators: usize,
}

/// Append-only list of iteration records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvergenceHistory {
    records: Vec<IterationRecord>,
}

impl ConvergenceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    pub fn log_likelihoods(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.log_likelihood)
    }

    /// Whether no log-likelihood drops by more than `tolerance` (relative to
    /// the larger magnitude of the pair) from one record to the next.
    pub fn is_non_decreasing(&self, tolerance: f64) -> bool {
        self.records.windows(2).all(|w| {
            let (prev, next) = (w[0].log_likelihood, w[1].log_likelihood);
            let scale = prev.abs().max(next.abs()).max(1.0);
            next >= prev - tolerance * scale
        })
    }

    /// Sum of degenerate denominators over all iterations.
    pub fn total_near_zero(&self) -> usize {
        self.records.iter().map(|r| r.near_zero_denominators).sum()
    }
}

/// Final state of a finished training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: HmmModel,
    pub history: ConvergenceHistory,
    /// Wall-clock time spent in [`Trainer::run`].
    pub elapsed: Duration,
}

/// Baum-Welch trainer over a borrowed corpus.
#[derive(Debug)]
pub struct Trainer<'a> {
    corpus: &'a Corpus,
    model: HmmModel,
    config: TrainingConfig,
    state: TrainerState,
    iteration: usize,
    history: ConvergenceHistory,
    accumulators: Accumulators,
    workspace: SequenceWorkspace,
}

impl<'a> Trainer<'a> {
    /// Create an idle trainer. The model alphabet must match the corpus.
    pub fn new(corpus: &'a Corpus, model: HmmModel, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        if model.n_symbols() != corpus.n_symbols() {
            return Err(Error::AlphabetMismatch {
                model: model.n_symbols(),
                corpus: corpus.n_symbols(),
            });
        }
        let accumulators = Accumulators::new(model.n_states(), model.n_symbols());
        Ok(Self {
            corpus,
            model,
            config,
            state: TrainerState::Idle,
            iteration: 0,
            history: ConvergenceHistory::new(),
            accumulators,
            workspace: SequenceWorkspace::new(),
        })
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn model(&self) -> &HmmModel {
        &self.model
    }

    pub fn history(&self) -> &ConvergenceHistory {
        &self.history
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Run one EM iteration. Returns `None` once the trainer is done.
    pub fn step(&mut self) -> Result<Option<IterationRecord>> {
        match self.state {
            TrainerState::Done => return Ok(None),
            TrainerState::Idle => {
                info!(
                    target: event_names::TRAIN_STARTED,
                    sequences = self.corpus.len(),
                    symbols = self.corpus.total_symbols(),
                    states = self.model.n_states(),
                    alphabet = self.model.n_symbols(),
                    max_iterations = self.config.max_iterations,
                    parallel = self.config.parallel,
                    "starting Baum-Welch"
                );
                if self.corpus.is_empty() {
                    warn!(
                        target: event_names::TRAIN_EMPTY_CORPUS,
                        "corpus has no sequences; model will not change"
                    );
                }
                self.state = TrainerState::Iterating;
            }
            TrainerState::Iterating => {}
        }

        self.expectation()?;

        self.iteration += 1;
        let record = IterationRecord {
            iter: self.iteration,
            log_likelihood: self.accumulators.log_likelihood,
            near_zero_denominators: self.accumulators.near_zero_denominators,
        };
        self.history.push(record);

        if record.near_zero_denominators > 0 {
            warn!(
                target: event_names::TRAIN_DEGENERATE,
                iter = record.iter,
                near_zero = record.near_zero_denominators,
                epsilon = self.config.epsilon,
                "denominators at or below epsilon were floored"
            );
        }

        if let Some(next) = maximize(&self.accumulators, &self.model, self.config.epsilon) {
            if next.carried_rows > 0 {
                debug!(
                    target: event_names::TRAIN_ROWS_CARRIED,
                    iter = record.iter,
                    carried_rows = next.carried_rows,
                    "rows without evidence kept their previous values"
                );
            }
            self.model
                .replace(next.transition, next.emission, next.initial);
        }

        debug!(
            target: event_names::TRAIN_ITERATION,
            iter = record.iter,
            log_likelihood = record.log_likelihood,
            near_zero = record.near_zero_denominators,
            "iteration complete"
        );

        if self.iteration >= self.config.max_iterations {
            self.state = TrainerState::Done;
        }
        Ok(Some(record))
    }

    /// Run every remaining iteration.
    pub fn run(mut self) -> Result<TrainingOutcome> {
        let start = Instant::now();
        while self.step()?.is_some() {}
        let elapsed = start.elapsed();

        info!(
            target: event_names::TRAIN_FINISHED,
            iterations = self.iteration,
            log_likelihood = self.history.last().map(|r| r.log_likelihood),
            elapsed_ms = elapsed.as_millis() as u64,
            "training finished"
        );

        Ok(TrainingOutcome {
            model: self.model,
            history: self.history,
            elapsed,
        })
    }

    fn expectation(&mut self) -> Result<()> {
        #[cfg(feature = "parallel")]
        if self.config.parallel {
            self.accumulators =
                parallel_expectation(&self.model, self.corpus, self.config.epsilon)?;
            return Ok(());
        }

        #[cfg(not(feature = "parallel"))]
        if self.config.parallel && self.iteration == 0 {
            warn!("built without the `parallel` feature; running the E-step sequentially");
        }

        self.accumulators.reset();
        for obs in self.corpus.iter() {
            self.accumulators.accumulate_sequence(
                &self.model,
                obs,
                self.config.epsilon,
                &mut self.workspace,
            )?;
        }
        Ok(())
    }
}

/// Per-worker accumulators merged by addition.
#[cfg(feature = "parallel")]
fn parallel_expectation(model: &HmmModel, corpus: &Corpus, epsilon: f64) -> Result<Accumulators> {
    use rayon::prelude::*;

    let (n, m) = (model.n_states(), model.n_symbols());
    corpus
        .sequences()
        .par_iter()
        .try_fold(
            || (Accumulators::new(n, m), SequenceWorkspace::new()),
            |(mut acc, mut ws), seq| {
                acc.accumulate_sequence(model, seq.symbols(), epsilon, &mut ws)?;
                Ok::<_, Error>((acc, ws))
            },
        )
        .map(|partial| partial.map(|(acc, _)| acc))
        .try_reduce(
            || Accumulators::new(n, m),
            |mut left, right| {
                left.merge(&right);
                Ok(left)
            },
        )
}

/// Train `model` on `corpus` for `config.max_iterations` iterations.
pub fn train(corpus: &Corpus, model: HmmModel, config: TrainingConfig) -> Result<TrainingOutcome> {
    Trainer::new(corpus, model, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> HmmModel {
        HmmModel::from_nested(
            &[vec![0.7, 0.3], vec![0.4, 0.6]],
            &[vec![0.5, 0.5], vec![0.1, 0.9]],
            &[0.6, 0.4],
        )
        .unwrap()
    }

    #[test]
    fn state_machine_walks_idle_iterating_done() {
        let corpus = Corpus::new(2, vec![vec![0, 1, 0, 1, 0]]).unwrap();
        let config = TrainingConfig::default().with_max_iterations(2);
        let mut trainer = Trainer::new(&corpus, model(), config).unwrap();

        assert_eq!(trainer.state(), TrainerState::Idle);
        let first = trainer.step().unwrap().unwrap();
        assert_eq!(first.iter, 1);
        assert_eq!(trainer.state(), TrainerState::Iterating);
        trainer.step().unwrap().unwrap();
        assert_eq!(trainer.state(), TrainerState::Done);
        assert!(trainer.step().unwrap().is_none());
        assert_eq!(trainer.history().len(), 2);
    }

    #[test]
    fn history_has_one_record_per_iteration() {
        let corpus = Corpus::new(2, vec![vec![0, 1, 1], vec![1, 0]]).unwrap();
        let outcome = train(
            &corpus,
            model(),
            TrainingConfig::default().with_max_iterations(7),
        )
        .unwrap();
        let iters: Vec<usize> = outcome.history.records().iter().map(|r| r.iter).collect();
        assert_eq!(iters, (1..=7).collect::<Vec<_>>());
        assert!(outcome.history.is_non_decreasing(1e-9));
    }

    #[test]
    fn rejects_alphabet_mismatch() {
        let corpus = Corpus::new(3, vec![vec![2]]).unwrap();
        let err = Trainer::new(&corpus, model(), TrainingConfig::default()).unwrap_err();
        assert!(matches!(err, Error::AlphabetMismatch { model: 2, corpus: 3 }));
    }

    #[test]
    fn rejects_bad_options() {
        let corpus = Corpus::new(2, vec![vec![0]]).unwrap();
        let zero = TrainingConfig::default().with_max_iterations(0);
        assert!(matches!(
            Trainer::new(&corpus, model(), zero),
            Err(Error::InvalidTrainingOption(_))
        ));
        let eps = TrainingConfig::default().with_epsilon(0.0);
        assert!(matches!(
            Trainer::new(&corpus, model(), eps),
            Err(Error::InvalidTrainingOption(_))
        ));
    }

    #[test]
    fn empty_corpus_leaves_model_unchanged() {
        let corpus = Corpus::new(2, Vec::new()).unwrap();
        let outcome = train(
            &corpus,
            model(),
            TrainingConfig::default().with_max_iterations(3),
        )
        .unwrap();
        assert_eq!(outcome.model, model());
        assert_eq!(outcome.history.len(), 3);
        assert!(outcome.history.log_likelihoods().all(|ll| ll == 0.0));
    }

    #[test]
    fn history_serializes_camel_case() {
        let record = IterationRecord {
            iter: 1,
            log_likelihood: -3.5,
            near_zero_denominators: 0,
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["logLikelihood"], -3.5);
        assert_eq!(json["nearZeroDenominators"], 0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let seqs: Vec<Vec<usize>> = (0..32)
            .map(|k| (0..(5 + k % 7)).map(|t| (t * 3 + k) % 2).collect())
            .collect();
        let corpus = Corpus::new(2, seqs).unwrap();
        let base = TrainingConfig::default().with_max_iterations(5);

        let seq = train(&corpus, model(), base).unwrap();
        let par = train(&corpus, model(), base.with_parallel(true)).unwrap();
        for (a, b) in seq.history.log_likelihoods().zip(par.history.log_likelihoods()) {
            assert!((a - b).abs() < 1e-9 * a.abs().max(1.0));
        }
    }
}
