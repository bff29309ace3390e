//! Enhancement service configuration
//!
//! Every section is `#[serde(default)]` so a partial TOML file only overrides
//! what it names:
//!
//! ```toml
//! enable_model_backed_enhancing = true
//!
//! [cache]
//! max_size = 500
//!
//! [model]
//! name = "llama3.2"
//! host = "http://localhost:11434"
//! timeout_ms = 8000
//! ```
//!
//! `FORMSENSE_MODEL_HOST` overrides `model.host` after the file is read.

use formsense_common::config::{load_toml_or_default, LoggingConfig};
use formsense_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable overriding the inference host address
pub const MODEL_HOST_ENV_VAR: &str = "FORMSENSE_MODEL_HOST";

/// Enhancement cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum resident entries
    pub max_size: usize,
    /// Default entry lifetime
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Model-backed enhancer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name passed to the inference host
    pub name: String,
    /// Inference host base URL
    pub host: String,
    /// Per-attempt deadline
    pub timeout_ms: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Backoff unit; retry `n` waits `n * retry_delay_ms`
    pub retry_delay_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "llama3.2".to_string(),
            host: "http://localhost:11434".to_string(),
            timeout_ms: 10_000,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Boundaries for `ConfidenceLevel` classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
            low: 0.2,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Register the rule-based fallback enhancer
    pub enable_rule_based_enhancing: bool,
    pub enable_model_backed_enhancing: bool,
    pub enable_cache: bool,
    pub cache: CacheConfig,
    pub model: ModelConfig,
    pub confidence_thresholds: ConfidenceThresholds,
    pub logging: LoggingConfig,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enable_rule_based_enhancing: true,
            enable_model_backed_enhancing: false,
            enable_cache: true,
            cache: CacheConfig::default(),
            model: ModelConfig::default(),
            confidence_thresholds: ConfidenceThresholds::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EnhancementConfig {
    /// Load from the resolved config file, apply env overrides, validate
    ///
    /// # Errors
    /// - Config file exists but is unreadable or malformed
    /// - Resulting config fails [`EnhancementConfig::validate`]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config: Self = load_toml_or_default(explicit)?;

        if let Ok(host) = std::env::var(MODEL_HOST_ENV_VAR) {
            if !host.trim().is_empty() {
                info!(host = %host, "Model host overridden from environment");
                config.model.host = host;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    ///
    /// Thresholds must lie in 0.0-1.0 and satisfy `high >= medium >= low`.
    pub fn validate(&self) -> Result<()> {
        let t = &self.confidence_thresholds;
        for (name, value) in [("high", t.high), ("medium", t.medium), ("low", t.low)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "confidence_thresholds.{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }
        if !(t.high >= t.medium && t.medium >= t.low) {
            return Err(Error::Config(format!(
                "confidence thresholds must satisfy high >= medium >= low (got {} / {} / {})",
                t.high, t.medium, t.low
            )));
        }
        if self.cache.max_size == 0 {
            return Err(Error::Config("cache.max_size must be at least 1".to_string()));
        }
        if self.model.timeout_ms == 0 {
            return Err(Error::Config("model.timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Copy of `self` with every set field of `patch` applied
    pub fn merged_with(&self, patch: EnhancementConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.enable_rule_based_enhancing {
            next.enable_rule_based_enhancing = v;
        }
        if let Some(v) = patch.enable_model_backed_enhancing {
            next.enable_model_backed_enhancing = v;
        }
        if let Some(v) = patch.enable_cache {
            next.enable_cache = v;
        }
        if let Some(v) = patch.cache {
            next.cache = v;
        }
        if let Some(v) = patch.model {
            next.model = v;
        }
        if let Some(v) = patch.confidence_thresholds {
            next.confidence_thresholds = v;
        }
        next
    }
}

/// Partial update for [`EnhancementConfig`]; unset fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfigPatch {
    pub enable_rule_based_enhancing: Option<bool>,
    pub enable_model_backed_enhancing: Option<bool>,
    pub enable_cache: Option<bool>,
    pub cache: Option<CacheConfig>,
    pub model: Option<ModelConfig>,
    pub confidence_thresholds: Option<ConfidenceThresholds>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EnhancementConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = EnhancementConfig::from_toml_str(
            "enable_model_backed_enhancing = true\n[cache]\nmax_size = 5\n",
        )
        .unwrap();

        assert!(config.enable_model_backed_enhancing);
        assert!(config.enable_cache);
        assert_eq!(config.cache.max_size, 5);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_misordered_thresholds_rejected() {
        let mut config = EnhancementConfig::default();
        config.confidence_thresholds = ConfidenceThresholds {
            high: 0.4,
            medium: 0.6,
            low: 0.1,
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let result = EnhancementConfig::from_toml_str("[confidence_thresholds]\nhigh = 1.5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_cache_size_rejected() {
        let result = EnhancementConfig::from_toml_str("[cache]\nmax_size = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let base = EnhancementConfig::default();
        let next = base.merged_with(EnhancementConfigPatch {
            enable_cache: Some(false),
            ..Default::default()
        });

        assert!(!next.enable_cache);
        assert_eq!(next.cache, base.cache);
        assert_eq!(next.model, base.model);
    }
}
