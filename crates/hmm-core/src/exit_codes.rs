//! Exit codes for the hmm-train CLI.
//!
//! Exit code ranges:
//! - 0: Success
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use crate::error::{Error, ErrorCategory};

/// Exit codes for hmm-train operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Corpus or model input rejected
    InputError = 11,

    /// Configuration file invalid or missing
    ConfigError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Input | ErrorCategory::Model => ExitCode::InputError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Numeric => match err {
                Error::InvalidTrainingOption(_) => ExitCode::ArgsError,
                _ => ExitCode::InternalError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::InputError.as_i32(), 11);
        assert_eq!(ExitCode::ConfigError.as_i32(), 12);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_error_mapping() {
        let input = Error::EmptySequence { sequence: 1 };
        assert_eq!(ExitCode::from(&input), ExitCode::InputError);

        let option = Error::InvalidTrainingOption("epsilon".into());
        assert_eq!(ExitCode::from(&option), ExitCode::ArgsError);

        let scaling = Error::ScalingMismatch("length".into());
        assert_eq!(ExitCode::from(&scaling), ExitCode::InternalError);

        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(ExitCode::from(&io), ExitCode::IoError);
    }

    #[test]
    fn test_categories() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::InputError.is_user_error());
        assert!(!ExitCode::IoError.is_user_error());
        assert_eq!(ExitCode::ConfigError.code_name(), "ERR_CONFIG");
    }
}
