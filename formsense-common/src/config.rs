//! Configuration file resolution and loading
//!
//! Config file resolution follows this priority order:
//! 1. Explicit path supplied by the embedding process (highest priority)
//! 2. `FORMSENSE_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/formsense/formsense.toml`)
//! 4. Compiled defaults (fallback, no file)
//!
//! A missing file is never fatal: the caller gets compiled defaults and a warning.
//! A file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FORMSENSE_CONFIG";

/// File name looked up inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "formsense.toml";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no candidate exists on disk.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit path
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config directory
    default_config_path().filter(|p| p.exists())
}

/// `<config_dir>/formsense/formsense.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("formsense").join(CONFIG_FILE_NAME))
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(toml::from_str(content)?)
}

/// Load `T` from the resolved config file, falling back to `T::default()`
///
/// # Errors
/// - `Error::Io` if the resolved file exists but cannot be read
/// - `Error::TomlParse` if the content is not valid TOML for `T`
pub fn load_toml_or_default<T>(explicit: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = resolve_config_path(explicit) else {
        info!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file does not exist, using compiled defaults"
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read config file");
        Error::Io(e)
    })?;
    let config = parse_toml(&content)?;

    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_parse_toml_partial_uses_defaults() {
        let sample: Sample = parse_toml("name = \"x\"").unwrap();
        assert_eq!(sample.name, "x");
        assert_eq!(sample.logging.level, "info");
    }

    #[test]
    fn test_parse_toml_invalid_is_error() {
        let result: Result<Sample> = parse_toml("name = ");
        assert!(matches!(result, Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_unreadable_config_is_io_error() {
        // A directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Sample> = load_toml_or_default(Some(dir.path()));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/explicit-formsense.toml");
        assert_eq!(resolve_config_path(Some(&path)), Some(path));
    }
}
