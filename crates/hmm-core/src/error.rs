//! Error types for hmm-core.
//!
//! Every error carries a stable numeric code and a category so the CLI can
//! emit structured error objects:
//!
//! ```json
//! {
//!   "code": 12,
//!   "category": "input",
//!   "message": "sequence 3, position 7: symbol 5 outside alphabet of size 4"
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for hmm-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Corpus or request input that violates the reader contract.
    Input,
    /// Model parameters with the wrong shape or values.
    Model,
    /// Numerical contract violations inside the recurrences.
    Numeric,
    /// Trainer configuration errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Numeric => write!(f, "numeric"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for hmm-core.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("malformed input at token {position}: expected {expected}, found {found}")]
    MalformedInput {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("sequence {sequence}, position {position}: symbol {symbol} outside alphabet of size {n_symbols}")]
    SymbolOutOfRange {
        sequence: usize,
        position: usize,
        symbol: usize,
        n_symbols: usize,
    },

    #[error("sequence {sequence} is empty")]
    EmptySequence { sequence: usize },

    #[error("unknown init mode {0}, expected 0 (random) or 1 (supplied)")]
    InvalidInitMode(u64),

    #[error("invalid JSON at line {line}, column {column}: {message}")]
    InvalidJson {
        line: usize,
        column: usize,
        message: String,
    },

    // Model errors (20-29)
    #[error("{name} has shape {actual}, expected {expected}")]
    ShapeMismatch {
        name: &'static str,
        expected: String,
        actual: String,
    },

    #[error("invalid value {value} in {name} at ({row}, {col})")]
    InvalidParameter {
        name: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("model emits {model} symbols but the corpus alphabet has {corpus}")]
    AlphabetMismatch { model: usize, corpus: usize },

    #[error("{name} is not stochastic: deviation {deviation:e} exceeds tolerance {tolerance:e}")]
    NotStochastic {
        name: &'static str,
        deviation: f64,
        tolerance: f64,
    },

    #[error("parameter index ({row}, {col}) is outside {name} ({rows}x{cols})")]
    ParameterIndex {
        name: &'static str,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    // Numeric errors (30-39)
    #[error("scaling factors do not belong to this sequence and model: {0}")]
    ScalingMismatch(String),

    #[error("invalid training option: {0}")]
    InvalidTrainingOption(String),

    // Config errors (40-49)
    #[error(transparent)]
    Config(#[from] hmm_config::ConfigError),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a parse failure of user-supplied JSON.
    pub fn invalid_json(err: &serde_json::Error) -> Self {
        Error::InvalidJson {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }

    /// Returns the stable error code for this error type.
    ///
    /// - 10-19: Input errors
    /// - 20-29: Model errors
    /// - 30-39: Numeric errors
    /// - 40-49: Config errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidDimensions(_) => 10,
            Error::MalformedInput { .. } => 11,
            Error::SymbolOutOfRange { .. } => 12,
            Error::EmptySequence { .. } => 13,
            Error::InvalidInitMode(_) => 14,
            Error::InvalidJson { .. } => 15,
            Error::ShapeMismatch { .. } => 20,
            Error::InvalidParameter { .. } => 21,
            Error::AlphabetMismatch { .. } => 22,
            Error::NotStochastic { .. } => 23,
            Error::ParameterIndex { .. } => 24,
            Error::ScalingMismatch(_) => 30,
            Error::InvalidTrainingOption(_) => 31,
            Error::Config(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidDimensions(_)
            | Error::MalformedInput { .. }
            | Error::SymbolOutOfRange { .. }
            | Error::EmptySequence { .. }
            | Error::InvalidInitMode(_)
            | Error::InvalidJson { .. } => ErrorCategory::Input,

            Error::ShapeMismatch { .. }
            | Error::InvalidParameter { .. }
            | Error::AlphabetMismatch { .. }
            | Error::NotStochastic { .. }
            | Error::ParameterIndex { .. } => ErrorCategory::Model,

            Error::ScalingMismatch(_) | Error::InvalidTrainingOption(_) => ErrorCategory::Numeric,

            Error::Config(_) => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Structured form for machine-readable error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "category": self.category(),
            "message": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_fall_in_category_ranges() {
        let cases: Vec<(Error, ErrorCategory)> = vec![
            (Error::EmptySequence { sequence: 0 }, ErrorCategory::Input),
            (Error::InvalidInitMode(3), ErrorCategory::Input),
            (
                Error::AlphabetMismatch { model: 2, corpus: 3 },
                ErrorCategory::Model,
            ),
            (
                Error::ScalingMismatch("length".into()),
                ErrorCategory::Numeric,
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
                ErrorCategory::Io,
            ),
        ];
        for (err, category) in cases {
            assert_eq!(err.category(), category, "{err}");
            let code = err.code();
            let expected_range = match category {
                ErrorCategory::Input => 10..20,
                ErrorCategory::Model => 20..30,
                ErrorCategory::Numeric => 30..40,
                ErrorCategory::Config => 40..50,
                ErrorCategory::Io => 60..70,
            };
            assert!(expected_range.contains(&code), "{err}: code {code}");
        }
    }

    #[test]
    fn symbol_error_message() {
        let err = Error::SymbolOutOfRange {
            sequence: 3,
            position: 7,
            symbol: 5,
            n_symbols: 4,
        };
        assert_eq!(
            err.to_string(),
            "sequence 3, position 7: symbol 5 outside alphabet of size 4"
        );
    }

    #[test]
    fn json_shape() {
        let v = Error::InvalidInitMode(9).to_json();
        assert_eq!(v["code"], 14);
        assert_eq!(v["category"], "input");
        assert!(v["message"].as_str().unwrap().contains("init mode 9"));
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::Numeric.to_string(), "numeric");
        assert_eq!(
            serde_json::to_string(&ErrorCategory::Config).unwrap(),
            "\"config\""
        );
    }
}
