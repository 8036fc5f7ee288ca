//! Configuration snapshots for training reports.
//!
//! A snapshot records which configuration a training run used, so a report
//! can be reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::load::ResolvedConfig;
use crate::resolve::ConfigSource;
use crate::trainer::TrainerConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the config was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: ConfigSource,

    /// SHA-256 hash of the file content.
    #[serde(default)]
    pub sha256: Option<String>,

    /// The effective values.
    pub config: TrainerConfig,
}

impl ConfigSnapshot {
    pub fn from_resolved(resolved: &ResolvedConfig) -> Self {
        Self {
            timestamp: Utc::now(),
            schema_version: resolved.config.schema_version.clone(),
            path: resolved.path.as_ref().map(|p| p.display().to_string()),
            source: resolved.source,
            sha256: resolved.sha256.clone(),
            config: resolved.config.clone(),
        }
    }

    /// Whether this snapshot came from built-in defaults.
    pub fn is_builtin(&self) -> bool {
        self.source == ConfigSource::BuiltinDefault
    }
}
