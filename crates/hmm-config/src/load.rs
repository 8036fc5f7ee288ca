//! Configuration loading.
//!
//! Files ending in `.json` are parsed as JSON, everything else as TOML.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::resolve::{resolve_config_path, ConfigSource};
use crate::snapshot::ConfigSnapshot;
use crate::trainer::TrainerConfig;
use crate::validate::{validate_config, ValidationError};

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loaded configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The effective configuration.
    pub config: TrainerConfig,
    /// Path the file was read from (None when using defaults).
    pub path: Option<PathBuf>,
    /// How the path was chosen.
    pub source: ConfigSource,
    /// SHA-256 of the file content (None when using defaults).
    pub sha256: Option<String>,
}

impl ResolvedConfig {
    /// Built-in defaults with no backing file.
    pub fn builtin() -> Self {
        Self {
            config: TrainerConfig::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
            sha256: None,
        }
    }

    /// Create a config snapshot for training reports.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::from_resolved(self)
    }
}

/// Load configuration with the standard resolution order and validate it.
pub fn load_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let (path, source) = resolve_config_path(cli_path);
    match path {
        Some(path) => {
            let (config, sha256) = load_config_file(&path)?;
            Ok(ResolvedConfig {
                config,
                path: Some(path),
                source,
                sha256: Some(sha256),
            })
        }
        None => Ok(ResolvedConfig::builtin()),
    }
}

/// Read, parse and validate a single config file.
///
/// Returns the config and the SHA-256 of the raw content.
pub fn load_config_file(path: &Path) -> Result<(TrainerConfig, String), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = parse_config(path, &content)?;
    validate_config(&config)?;

    Ok((config, sha256_hex(content.as_bytes())))
}

fn parse_config(path: &Path, content: &str) -> Result<TrainerConfig, ConfigError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(content).map_err(|e| ConfigError::JsonParse {
            path: path.to_path_buf(),
            source: e,
        })
    } else {
        toml::from_str(content).map_err(|e| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
