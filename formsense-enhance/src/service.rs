//! Field Enhancement Service
//!
//! Single entry point of the pipeline. Owns the enhancement cache, the
//! priority-ordered enhancer set and the inference backend.
//!
//! # Flow
//! 1. Fingerprint the field
//! 2. Cache hit → return it re-tagged `cache`
//! 3. Select enabled enhancers whose `can_enhance` accepts the field
//! 4. Fan out to all of them concurrently and wait for every one
//! 5. Merge by confidence
//! 6. Cache the merged result when confidence > 0
//!
//! Concurrent calls for the same uncached fingerprint each run the enhancers;
//! the cache gives at most one inference per fingerprint per TTL window, not
//! single-flight.
//!
//! # Construction
//! ```rust,ignore
//! let service = FieldEnhancementService::builder()
//!     .config(EnhancementConfig::load(None)?)
//!     .build()?;
//! let result = service.enhance(&ctx).await;
//! ```

use crate::cache::{fingerprint, CacheStats, EnhancementCache};
use crate::config::{EnhancementConfig, EnhancementConfigPatch};
use crate::enhancers::{run_enhancers, ModelBackedEnhancer, RuleBasedEnhancer, MODEL_ENHANCER_NAME};
use crate::inference::{ConnectionStatus, InferenceBackend, OllamaClient};
use crate::merge::merge_results;
use crate::types::{
    ConfidenceLevel, EnhancementResult, EnhancementSource, FieldContext, FieldEnhancer,
};
use formsense_common::{Error, Result};
use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Contexts enhanced concurrently per `enhance_many` batch
pub const BATCH_SIZE: usize = 10;

/// Builder for [`FieldEnhancementService`]
#[derive(Default)]
pub struct FieldEnhancementServiceBuilder {
    config: Option<EnhancementConfig>,
    backend: Option<Arc<dyn InferenceBackend>>,
}

impl FieldEnhancementServiceBuilder {
    pub fn config(mut self, config: EnhancementConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Inference backend for the model-backed enhancer
    ///
    /// Defaults to an [`OllamaClient`] for `config.model.host`.
    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// # Errors
    /// - Config fails validation
    /// - Default HTTP backend cannot be constructed
    pub fn build(self) -> Result<FieldEnhancementService> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let backend: Arc<dyn InferenceBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(
                OllamaClient::new(config.model.host.clone())
                    .map_err(|e| Error::Internal(e.to_string()))?,
            ),
        };

        let enhancers = default_enhancers(&config, &backend);
        let cache = EnhancementCache::new(config.cache.max_size, config.cache.ttl());

        info!(
            enhancers = enhancers.len(),
            cache_enabled = config.enable_cache,
            model_enabled = config.enable_model_backed_enhancing,
            "Field enhancement service initialized"
        );

        Ok(FieldEnhancementService {
            config: RwLock::new(config),
            enhancers: RwLock::new(enhancers),
            cache: Mutex::new(cache),
            backend,
        })
    }
}

/// Enhancer set implied by a config, sorted by priority
fn default_enhancers(
    config: &EnhancementConfig,
    backend: &Arc<dyn InferenceBackend>,
) -> Vec<Arc<dyn FieldEnhancer>> {
    let mut enhancers: Vec<Arc<dyn FieldEnhancer>> = Vec::new();
    if config.enable_model_backed_enhancing {
        enhancers.push(Arc::new(ModelBackedEnhancer::new(Arc::clone(backend), &config.model)));
    }
    if config.enable_rule_based_enhancing {
        enhancers.push(Arc::new(RuleBasedEnhancer::new()));
    }
    enhancers.sort_by_key(|e| e.priority());
    enhancers
}

/// Orchestrates cache, enhancers and merge for form fields
pub struct FieldEnhancementService {
    config: RwLock<EnhancementConfig>,
    enhancers: RwLock<Vec<Arc<dyn FieldEnhancer>>>,
    /// Guards each read-check-evict / write-evict sequence; never held across `.await`
    cache: Mutex<EnhancementCache>,
    backend: Arc<dyn InferenceBackend>,
}

impl FieldEnhancementService {
    pub fn builder() -> FieldEnhancementServiceBuilder {
        FieldEnhancementServiceBuilder::default()
    }

    /// Service for `config` backed by the default HTTP client
    pub fn new(config: EnhancementConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    // ========================================================================
    // Enhancement
    // ========================================================================

    /// Classify one field
    ///
    /// Never fails: when no enhancer contributes, the result has confidence 0
    /// and source `hybrid`, and is not cached.
    pub async fn enhance(&self, ctx: &FieldContext) -> EnhancementResult {
        let fp = fingerprint(ctx);
        let cache_enabled = self.read_config().enable_cache;

        if cache_enabled {
            let cached = self.lock_cache().get(&fp);
            if let Some(mut hit) = cached {
                debug!(fingerprint = %fp, "Enhancement cache hit");
                hit.source = EnhancementSource::Cache;
                return hit;
            }
        }

        let selected: Vec<Arc<dyn FieldEnhancer>> = self
            .read_enhancers()
            .iter()
            .filter(|e| e.is_enabled() && e.can_enhance(ctx))
            .cloned()
            .collect();

        debug!(
            fingerprint = %fp,
            selected = ?selected.iter().map(|e| e.name()).collect::<Vec<_>>(),
            "Enhancement cache miss, running enhancers"
        );

        let outputs = run_enhancers(&selected, ctx).await;
        let merged = merge_results(&outputs);

        if cache_enabled && merged.confidence > 0.0 {
            self.lock_cache().set(&fp, merged.clone(), None);
        }

        merged
    }

    /// Classify many fields, `BATCH_SIZE` at a time
    ///
    /// Batches run strictly one after another with full concurrency inside a
    /// batch. Output order matches input order.
    pub async fn enhance_many(&self, contexts: &[FieldContext]) -> Vec<EnhancementResult> {
        let mut results = Vec::with_capacity(contexts.len());

        for (index, batch) in contexts.chunks(BATCH_SIZE).enumerate() {
            debug!(batch = index, size = batch.len(), "Enhancing batch");
            let batch_results = join_all(batch.iter().map(|ctx| self.enhance(ctx))).await;
            results.extend(batch_results);
        }

        results
    }

    /// Classify a confidence against the configured thresholds
    pub fn confidence_level(&self, confidence: f32) -> ConfidenceLevel {
        let t = self.read_config().confidence_thresholds;
        if confidence >= t.high {
            ConfidenceLevel::High
        } else if confidence >= t.medium {
            ConfidenceLevel::Medium
        } else if confidence >= t.low {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::None
        }
    }

    // ========================================================================
    // Enhancer management
    // ========================================================================

    /// Add an enhancer, keeping the set sorted by priority
    ///
    /// Enhancers with equal priority keep registration order.
    pub fn register_enhancer(&self, enhancer: Arc<dyn FieldEnhancer>) {
        let mut enhancers = self.write_enhancers();
        debug!(enhancer = enhancer.name(), priority = enhancer.priority(), "Registering enhancer");
        enhancers.push(enhancer);
        enhancers.sort_by_key(|e| e.priority());
    }

    /// Names of registered enhancers in priority order
    pub fn enhancer_names(&self) -> Vec<&'static str> {
        self.read_enhancers().iter().map(|e| e.name()).collect()
    }

    /// Turn the model-backed enhancer on or off
    ///
    /// Enabling registers it if absent. Disabling leaves it registered but inert.
    pub fn enable_model_backed_enhancing(&self, enable: bool) {
        let existing = self
            .read_enhancers()
            .iter()
            .find(|e| e.name() == MODEL_ENHANCER_NAME)
            .cloned();

        match existing {
            Some(enhancer) => enhancer.set_enabled(enable),
            None if enable => {
                let model = self.read_config().model.clone();
                self.register_enhancer(Arc::new(ModelBackedEnhancer::new(
                    Arc::clone(&self.backend),
                    &model,
                )));
            }
            None => {}
        }

        self.write_config().enable_model_backed_enhancing = enable;
        info!(enabled = enable, "Model-backed enhancing toggled");
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn config(&self) -> EnhancementConfig {
        self.read_config().clone()
    }

    /// Apply a partial config and rebuild the enhancer set from it
    ///
    /// Custom enhancers registered earlier are dropped. Cache entries are kept
    /// (trimmed to the new size) unless caching is turned off.
    ///
    /// # Errors
    /// Returns `Error::Config` and changes nothing if the result is invalid.
    pub fn update_config(&self, patch: EnhancementConfigPatch) -> Result<()> {
        let next = self.read_config().merged_with(patch);
        next.validate()?;

        self.backend.set_host(&next.model.host);

        {
            let mut cache = self.lock_cache();
            cache.reconfigure(next.cache.max_size, next.cache.ttl());
            if !next.enable_cache {
                cache.clear();
            }
        }

        *self.write_enhancers() = default_enhancers(&next, &self.backend);
        *self.write_config() = next;

        info!("Enhancement config updated, enhancer set rebuilt");
        Ok(())
    }

    /// Point the inference backend at another host
    pub fn set_model_host(&self, host: &str) {
        self.backend.set_host(host);
        self.write_config().model.host = self.backend.host();
    }

    /// Probe the inference host
    pub async fn test_model_connection(&self) -> ConnectionStatus {
        self.backend.test_connection().await
    }

    // ========================================================================
    // Cache
    // ========================================================================

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
        debug!("Enhancement cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Eagerly drop expired cache entries
    pub fn purge_expired_cache(&self) -> usize {
        self.lock_cache().purge_expired()
    }

    // ========================================================================
    // Lock helpers (a poisoned lock still holds consistent data here)
    // ========================================================================

    fn lock_cache(&self) -> MutexGuard<'_, EnhancementCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_config(&self) -> RwLockReadGuard<'_, EnhancementConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_config(&self) -> RwLockWriteGuard<'_, EnhancementConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_enhancers(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn FieldEnhancer>>> {
        self.enhancers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_enhancers(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn FieldEnhancer>>> {
        self.enhancers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
