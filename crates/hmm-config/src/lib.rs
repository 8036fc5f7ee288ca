//! hmm-train configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the trainer config file (TOML or JSON)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Config snapshots for training reports

pub mod load;
pub mod resolve;
pub mod snapshot;
pub mod trainer;
pub mod validate;

pub use load::{load_config, load_config_file, ConfigError, ResolvedConfig};
pub use resolve::{resolve_config_path, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use trainer::{OutputSection, TrainerConfig, TrainingSection};
pub use validate::{validate_config, validate_epsilon, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
