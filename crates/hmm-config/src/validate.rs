//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::trainer::TrainerConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Largest epsilon accepted. Anything bigger visibly biases the re-estimates.
const MAX_EPSILON: f64 = 1e-3;

/// Validate a trainer configuration semantically.
pub fn validate_config(config: &TrainerConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    let training = &config.training;
    if training.max_iterations == 0 {
        return Err(invalid("training.max_iterations", "Must be at least 1"));
    }

    validate_epsilon("training.epsilon", training.epsilon)?;

    let tol = training.stochastic_tolerance;
    if !(tol.is_finite() && tol > 0.0 && tol < 1.0) {
        return Err(invalid(
            "training.stochastic_tolerance",
            format!("Must be in (0, 1), got {}", tol),
        ));
    }

    if config.output.precision > 17 {
        return Err(invalid(
            "output.precision",
            format!("Must be at most 17, got {}", config.output.precision),
        ));
    }

    Ok(())
}

/// Check an epsilon floor value. Also used for CLI overrides.
pub fn validate_epsilon(field: &str, epsilon: f64) -> ValidationResult<()> {
    if !(epsilon.is_finite() && epsilon > 0.0 && epsilon <= MAX_EPSILON) {
        return Err(invalid(
            field,
            format!("Must be in (0, {:e}], got {:e}", MAX_EPSILON, epsilon),
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}
