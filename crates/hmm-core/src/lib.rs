//! hmm-core: discrete hidden Markov model training.
//!
//! The core is a scaled Baum-Welch trainer ([`baum_welch`]) over a
//! validated [`Corpus`]. Around it sit the corpus readers ([`input`]),
//! likelihood scoring and sensitivity sweeps ([`scoring`]), generative
//! sampling ([`sampling`]), report rendering ([`report`]) and the CLI
//! plumbing ([`logging`], [`exit_codes`]).
//!
//! ```ignore
//! use hmm_core::{parse_text, train, HmmModel, TrainingConfig};
//! use rand::SeedableRng;
//!
//! let input = parse_text("2 2 1\n0\n0\n5\n0 1 0 1 0\n")?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let model = HmmModel::random(input.n_states, input.n_symbols, &mut rng)?;
//! let outcome = train(&input.corpus, model, TrainingConfig::default())?;
//! println!("{:?}", outcome.history.last());
//! ```

pub mod baum_welch;
pub mod corpus;
pub mod error;
pub mod exit_codes;
pub mod input;
pub mod logging;
pub mod model;
pub mod report;
pub mod sampling;
pub mod scoring;

pub use baum_welch::{
    backward, forward, maximize, posterior_table, train, Accumulators, ConvergenceHistory,
    IterationRecord, ScalingFactors, SequenceWorkspace, Trainer, TrainerState, TrainingConfig,
    TrainingOutcome,
};
pub use corpus::{Corpus, ObservationSequence};
pub use error::{Error, ErrorCategory, Result};
pub use exit_codes::ExitCode;
pub use hmm_math::Matrix;
pub use input::{
    parse_input, parse_json, parse_model_json, parse_text, render_text_input, InputFormat,
    ModelParams, TrainingInput,
};
pub use model::{HmmModel, InitMode};
pub use report::{OutputFormat, TrainingReport};
pub use sampling::{sample_corpus, sample_sequence, SampledSequence};
pub use scoring::{
    log_domain_likelihood, perturb_entry, score_corpus, sensitivity_sweep, CorpusScore,
    ParameterCell, ParameterTarget, SensitivityReport, SweepPoint,
};
