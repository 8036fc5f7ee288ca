//! Scaled Baum-Welch (EM) training for discrete HMMs.
//!
//! - [`forward`]: scaled alpha table and the per-step factors `c[t]`
//! - [`backward`]: scaled beta table reusing exactly those factors
//! - [`Accumulators`]: gamma/xi statistics folded across the corpus
//! - [`maximize`]: model re-estimation from the folded statistics
//! - [`Trainer`]: the fixed-iteration EM loop and its history
//!
//! All divisions by a normalizing sum add an epsilon floor first. This is an
//! approximation on zero-probability paths; the number of floored
//! denominators is reported per iteration instead of raising an error.

pub mod backward;
pub mod expectation;
pub mod forward;
pub mod maximization;
pub mod trainer;

pub use backward::backward;
pub use expectation::{posterior_table, state_posteriors, Accumulators, SequenceWorkspace};
pub use forward::{forward, ScalingFactors};
pub use maximization::{maximize, Reestimated};
pub use trainer::{
    train, ConvergenceHistory, IterationRecord, Trainer, TrainerState, TrainingConfig,
    TrainingOutcome,
};
