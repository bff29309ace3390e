//! Field Enhancers
//!
//! Independent classifiers implementing the `FieldEnhancer` trait from `types`.
//!
//! # Enhancers
//! 1. **rule_based** - static pattern tables, always applicable (fallback)
//! 2. **model_backed** - local LLM inference with timeout and retries
//!
//! # Parallel Execution
//! All selected enhancers are launched before any is awaited, and the join waits
//! for every one of them. Failures are isolated: an enhancer that errors just
//! contributes nothing.

pub mod model_backed;
pub mod patterns;
pub mod rule_based;

pub use model_backed::{ModelBackedEnhancer, MODEL_ENHANCER_NAME};
pub use rule_based::{RuleBasedEnhancer, RULE_ENHANCER_NAME};

use crate::types::{EnhancementResult, FieldContext, FieldEnhancer};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// One enhancer's successful, non-empty output
#[derive(Debug, Clone)]
pub struct EnhancerOutput {
    /// Name of the enhancer that produced this output
    pub enhancer_name: &'static str,
    pub result: EnhancementResult,
}

/// Run every enhancer concurrently against `ctx`
///
/// Returns contributions in the order of `enhancers` (not completion order),
/// which makes merge tie-breaking follow enhancer priority.
pub async fn run_enhancers(
    enhancers: &[Arc<dyn FieldEnhancer>],
    ctx: &FieldContext,
) -> Vec<EnhancerOutput> {
    let futures = enhancers.iter().map(|enhancer| {
        let enhancer = Arc::clone(enhancer);
        async move {
            let name = enhancer.name();
            match enhancer.enhance(ctx).await {
                Ok(Some(result)) => {
                    debug!(
                        enhancer = name,
                        confidence = result.confidence,
                        "Enhancement produced"
                    );
                    Some(EnhancerOutput {
                        enhancer_name: name,
                        result,
                    })
                }
                Ok(None) => {
                    debug!(enhancer = name, "Enhancer declined");
                    None
                }
                Err(e) => {
                    warn!(
                        enhancer = name,
                        error = %e,
                        "Enhancer failed (per-field error isolation)"
                    );
                    None
                }
            }
        }
    });

    join_all(futures).await.into_iter().flatten().collect()
}

// ============================================================================
// Mock Enhancers for Testing
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
