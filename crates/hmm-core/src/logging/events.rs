//! Structured event names and correlation context.

use serde::{Deserialize, Serialize};

/// Processing stages of an hmm-train run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading the corpus or model file.
    Parse,
    /// EM iterations.
    Train,
    /// Likelihood evaluation and sensitivity sweeps.
    Score,
    /// Generative sampling.
    Sample,
    /// Report rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Parse => "parse",
            Stage::Train => "train",
            Stage::Score => "score",
            Stage::Sample => "sample",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    // Input
    pub const INPUT_PARSED: &str = "input.parsed";
    pub const INPUT_NOT_STOCHASTIC: &str = "input.not_stochastic";

    // Train stage
    pub const TRAIN_STARTED: &str = "train.started";
    pub const TRAIN_ITERATION: &str = "train.iteration";
    pub const TRAIN_DEGENERATE: &str = "train.degenerate";
    pub const TRAIN_EMPTY_CORPUS: &str = "train.empty_corpus";
    pub const TRAIN_ROWS_CARRIED: &str = "train.rows_carried";
    pub const TRAIN_FINISHED: &str = "train.finished";

    // Score / sample stages
    pub const SCORE_FINISHED: &str = "score.finished";
    pub const SAMPLE_FINISHED: &str = "sample.finished";

    // Error events
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation fields attached to every event of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub run_id: String,
    /// Subcommand being executed.
    pub command: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            command: command.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Train).unwrap(), "\"train\"");
        assert_eq!(Stage::Sample.to_string(), "sample");
    }

    #[test]
    fn test_event_names_are_dotted() {
        for name in [
            event_names::TRAIN_STARTED,
            event_names::TRAIN_ITERATION,
            event_names::TRAIN_DEGENERATE,
            event_names::CONFIG_LOADED,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }
}
