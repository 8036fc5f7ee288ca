//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variable → XDG path → defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable holding an explicit config file path.
pub const ENV_CONFIG_PATH: &str = "HMM_TRAIN_CONFIG";

/// Standard config file name inside the XDG directory.
pub const CONFIG_FILENAME: &str = "hmm-train.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "hmm-train";

/// Resolve the configuration file path using the standard resolution order.
///
/// 1. Explicit CLI path (returned even if it does not exist, so the loader
///    can report it)
/// 2. `HMM_TRAIN_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/hmm-train/hmm-train.toml` (or `~/.config/...`)
/// 4. Built-in defaults (None)
pub fn resolve_config_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    resolve_with(
        cli_path,
        std::env::var(ENV_CONFIG_PATH).ok(),
        xdg_config_dir(),
    )
}

/// Resolution with the environment lookups injected.
pub fn resolve_with(
    cli_path: Option<&Path>,
    env_path: Option<String>,
    xdg_dir: Option<PathBuf>,
) -> (Option<PathBuf>, ConfigSource) {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    // 2. Environment variable
    if let Some(env_path) = env_path.filter(|p| !p.trim().is_empty()) {
        return (Some(PathBuf::from(env_path)), ConfigSource::Environment);
    }

    // 3. XDG config directory
    if let Some(dir) = xdg_dir {
        let path = dir.join(CONFIG_FILENAME);
        if path.is_file() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    // 4. Built-in default
    (None, ConfigSource::BuiltinDefault)
}

/// Get the XDG config directory for hmm-train.
pub fn xdg_config_dir() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(dirs::config_dir)?;
    Some(base.join(APP_NAME))
}
