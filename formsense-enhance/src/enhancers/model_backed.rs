//! Model-backed Enhancer
//!
//! Asks a local LLM host to classify the field.
//!
//! # Failure Policy
//! - `timeout_ms` bounds each attempt, not the whole call. A timeout ends the
//!   request; the enhancer declines rather than retrying a slow host. With
//!   retries the total can reach `(max_retries + 1) * timeout_ms` plus backoff.
//! - Transport failures retry up to `max_retries` times. Retry `n` waits
//!   `n * retry_delay_ms` (linear, no jitter: a local low-concurrency policy).
//! - An unparseable or unusable response is a decline.
//!
//! Every failure surfaces from [`FieldEnhancer::enhance`] as `Ok(None)`;
//! [`ModelBackedEnhancer::request_enhancement`] keeps the typed error.

use crate::config::ModelConfig;
use crate::inference::prompt::build_field_prompt;
use crate::inference::response::parse_model_response;
use crate::inference::{InferenceBackend, InferenceError, PromptRequest};
use crate::types::{non_empty, EnhanceError, EnhancementResult, FieldContext, FieldEnhancer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Enhancer name used for registration and lookup
pub const MODEL_ENHANCER_NAME: &str = "model";

/// Ahead of the rule-based fallback
const MODEL_PRIORITY: u32 = 50;

/// LLM field classifier
pub struct ModelBackedEnhancer {
    backend: Arc<dyn InferenceBackend>,
    model: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    enabled: AtomicBool,
}

impl ModelBackedEnhancer {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: &ModelConfig) -> Self {
        Self {
            backend,
            model: config.name.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Run the prompt with timeout and retries, keeping the failure reason
    ///
    /// # Errors
    /// - `Timeout` if an attempt exceeded the deadline
    /// - `Network` / `Api` once the retry budget is spent
    /// - `Parse` / `UnusableResponse` for responses that cannot be used
    pub async fn request_enhancement(
        &self,
        ctx: &FieldContext,
    ) -> Result<EnhancementResult, EnhanceError> {
        let request = PromptRequest {
            model: self.model.clone(),
            prompt: build_field_prompt(ctx),
        };

        let mut attempt: u32 = 0;
        loop {
            let outcome = match timeout(self.timeout, self.backend.send_prompt(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(EnhanceError::Timeout(self.timeout.as_millis() as u64));
                }
            };

            match outcome {
                Ok(response) => {
                    let result = parse_model_response(&response.response)?;
                    return Ok(result
                        .meta("model", self.model.clone())
                        .meta("attempts", attempt + 1));
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.retry_delay * attempt;
                    warn!(
                        model = %self.model,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Inference request failed, will retry after backoff"
                    );
                    sleep(backoff).await;
                }
                Err(e) => {
                    warn!(
                        model = %self.model,
                        attempts = attempt + 1,
                        error = %e,
                        "Inference request failed, retries exhausted"
                    );
                    return Err(match e {
                        InferenceError::Status { status, body } => {
                            EnhanceError::Api(format!("{}: {}", status, body))
                        }
                        other => EnhanceError::Network(other.to_string()),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl FieldEnhancer for ModelBackedEnhancer {
    fn name(&self) -> &'static str {
        MODEL_ENHANCER_NAME
    }

    fn priority(&self) -> u32 {
        MODEL_PRIORITY
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn can_enhance(&self, ctx: &FieldContext) -> bool {
        let e = &ctx.element;
        [&e.name, &e.label, &e.placeholder, &e.id]
            .into_iter()
            .any(|attr| non_empty(attr).is_some())
    }

    async fn enhance(&self, ctx: &FieldContext) -> Result<Option<EnhancementResult>, EnhanceError> {
        match self.request_enhancement(ctx).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                debug!(model = %self.model, reason = %e, "Model enhancer declined");
                Ok(None)
            }
        }
    }
}
