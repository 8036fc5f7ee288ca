//! Config loading tests against real files on disk.

use std::fs;

use hmm_config::{load_config, load_config_file, ConfigError, ConfigSource, ValidationError};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn loads_toml_with_overrides() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "hmm-train.toml",
        r#"
schema_version = "1.0.0"

[training]
max_iterations = 120
epsilon = 1e-50
seed = 7

[output]
precision = 4
"#,
    );

    let resolved = load_config(Some(&path)).expect("valid config");
    assert_eq!(resolved.source, ConfigSource::CliArgument);
    assert_eq!(resolved.path.as_deref(), Some(path.as_path()));
    assert_eq!(resolved.config.training.max_iterations, 120);
    assert_eq!(resolved.config.training.epsilon, 1e-50);
    assert_eq!(resolved.config.training.seed, Some(7));
    assert_eq!(resolved.config.output.precision, 4);
    assert_eq!(resolved.sha256.as_ref().map(String::len), Some(64));
}

#[test]
fn loads_json_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "trainer.json",
        r#"{"training": {"max_iterations": 3, "parallel": true}}"#,
    );

    let (config, _hash) = load_config_file(&path).expect("valid json config");
    assert_eq!(config.training.max_iterations, 3);
    assert!(config.training.parallel);
}

#[test]
fn invalid_toml_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.toml", "[training\nmax_iterations = ");

    let err = load_config_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse { .. }));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn semantic_errors_surface_as_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.toml", "[training]\nepsilon = 0.5\n");

    let err = load_config_file(&path).unwrap_err();
    match err {
        ConfigError::Validation(ValidationError::InvalidValue { field, .. }) => {
            assert_eq!(field, "training.epsilon");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn same_content_same_hash() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.toml", "[training]\nmax_iterations = 9\n");
    let b = write(&dir, "b.toml", "[training]\nmax_iterations = 9\n");

    let (_, ha) = load_config_file(&a).unwrap();
    let (_, hb) = load_config_file(&b).unwrap();
    assert_eq!(ha, hb);
}
