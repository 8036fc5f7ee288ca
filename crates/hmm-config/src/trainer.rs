//! Trainer configuration types.
//!
//! Every field has a default so a partial file (or no file at all) yields a
//! complete configuration.

use serde::{Deserialize, Serialize};

/// Default number of EM iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default additive floor applied before every division in the recurrences.
pub const DEFAULT_EPSILON: f64 = 1e-100;

/// Default tolerance for row-sum checks on model matrices.
pub const DEFAULT_STOCHASTIC_TOLERANCE: f64 = 1e-9;

/// Default number of decimals in text renderings.
pub const DEFAULT_PRECISION: usize = 6;

/// Top-level trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    /// Schema version of the file.
    pub schema_version: String,

    /// EM loop settings.
    pub training: TrainingSection,

    /// Report rendering settings.
    pub output: OutputSection,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            training: TrainingSection::default(),
            output: OutputSection::default(),
        }
    }
}

/// EM loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingSection {
    /// Fixed number of iterations; no early stopping is applied.
    pub max_iterations: usize,

    /// Floor added to every normalizing sum before division.
    pub epsilon: f64,

    /// Run the per-sequence E-step on a thread pool (needs the `parallel` feature).
    pub parallel: bool,

    /// Seed for the random initial model. `None` draws from the OS.
    pub seed: Option<u64>,

    /// Tolerance for row-sum checks.
    pub stochastic_tolerance: f64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            parallel: false,
            seed: None,
            stochastic_tolerance: DEFAULT_STOCHASTIC_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Decimal places for Markdown and summary renderings.
    pub precision: usize,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}
