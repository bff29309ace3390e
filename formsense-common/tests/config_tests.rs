//! Tests for config file resolution and graceful degradation
//!
//! Tests that manipulate FORMSENSE_CONFIG are marked with #[serial]
//! so they never race each other.

use formsense_common::config::{
    load_toml_or_default, resolve_config_path, LoggingConfig, CONFIG_ENV_VAR,
};
use formsense_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct TestConfig {
    #[serde(default)]
    enable_cache: bool,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_env_var_path_is_used() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "enable_cache = true").unwrap();
    env::set_var(CONFIG_ENV_VAR, file.path());

    let resolved = resolve_config_path(None);
    let config: TestConfig = load_toml_or_default(None).unwrap();

    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved.as_deref(), Some(file.path()));
    assert!(config.enable_cache);
}

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config: TestConfig = load_toml_or_default(Some(&missing)).unwrap();

    assert_eq!(config, TestConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "enable_cache = [not toml").unwrap();

    let result: Result<TestConfig, Error> = load_toml_or_default(Some(file.path()));

    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
#[serial]
fn test_logging_section_parsed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

    let config: TestConfig = load_toml_or_default(Some(file.path())).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert!(!config.enable_cache);
}
