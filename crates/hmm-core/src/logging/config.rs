//! Log level and format resolution.
//!
//! Sources, weakest first: built-in default (`warn`, human), `RUST_LOG`,
//! `HMM_LOG`, `HMM_LOG_FORMAT`, then the `-v`/`-q`/`--log-format` flags.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Console lines for people.
    #[default]
    Human,
    /// One JSON object per event.
    #[value(alias = "json")]
    Jsonl,
}

/// Minimum level that reaches stderr.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Keeps stderr quiet apart from degenerate iterations and failures.
    #[default]
    #[value(alias = "warning")]
    Warn,
    Error,
    #[value(alias = "quiet")]
    Off,
}

impl LogLevel {
    /// Level requested by `-q` and repeated `-v` flags, if any.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Option<Self> {
        if quiet {
            return Some(LogLevel::Error);
        }
        match verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }

    /// Lenient parse for environment values.
    fn parse_env(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).ok()
    }

    /// Level of the last bare or `target=level` directive in a `RUST_LOG` string.
    fn from_directives(directives: &str) -> Option<Self> {
        directives
            .rsplit(',')
            .filter_map(|d| d.rsplit('=').next())
            .find_map(Self::parse_env)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        };
        f.write_str(name)
    }
}

/// Raw logging variables read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEnv {
    pub hmm_log: Option<String>,
    pub rust_log: Option<String>,
    pub hmm_log_format: Option<String>,
}

impl LogEnv {
    pub fn capture() -> Self {
        Self {
            hmm_log: std::env::var("HMM_LOG").ok(),
            rust_log: std::env::var("RUST_LOG").ok(),
            hmm_log_format: std::env::var("HMM_LOG_FORMAT").ok(),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human lines with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment and CLI flags.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(&LogEnv::capture(), cli_level, cli_format)
    }

    /// Resolve from captured environment values and CLI flags.
    ///
    /// Unparseable environment values are ignored.
    pub fn resolve(env: &LogEnv, cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        let env_level = env
            .hmm_log
            .as_deref()
            .and_then(LogLevel::parse_env)
            .or_else(|| env.rust_log.as_deref().and_then(LogLevel::from_directives));
        let env_format = env
            .hmm_log_format
            .as_deref()
            .and_then(|v| <LogFormat as ValueEnum>::from_str(v.trim(), true).ok());

        Self {
            format: cli_format.or(env_format).unwrap_or_default(),
            level: cli_level.or(env_level).unwrap_or_default(),
            timestamps: true,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}
