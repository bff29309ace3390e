//! Result Merge
//!
//! Combines enhancer outputs attribute by attribute.
//!
//! # Strategy
//! Walk contributions in order. When one is strictly more confident than the
//! running result, it overwrites the attributes it actually set (`fieldType`,
//! `label`, `validation`) and raises the running confidence. Attributes it left
//! unset keep the earlier value.
//!
//! Metadata is diagnostic, so it is shallow-merged from every contributor
//! regardless of confidence; later keys overwrite earlier ones.
//!
//! Equal confidence never overwrites, so among tied contributors the first in
//! order (lowest priority number) wins.

use crate::enhancers::EnhancerOutput;
use crate::types::{EnhancementResult, EnhancementSource};
use tracing::debug;

/// Merge contributions into a single result
///
/// Starts from `{confidence: 0, source: hybrid}`. With exactly one contributor
/// the merged source is that contributor's own source.
pub fn merge_results(outputs: &[EnhancerOutput]) -> EnhancementResult {
    let mut merged = EnhancementResult::empty(EnhancementSource::Hybrid);

    for output in outputs {
        let candidate = &output.result;

        if candidate.confidence > merged.confidence {
            if let Some(field_type) = &candidate.field_type {
                merged.field_type = Some(field_type.clone());
            }
            if let Some(label) = &candidate.label {
                merged.label = Some(label.clone());
            }
            if let Some(validation) = &candidate.validation {
                merged.validation = Some(validation.clone());
            }
            merged.confidence = candidate.confidence;
        }

        merged
            .metadata
            .extend(candidate.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    if let [single] = outputs {
        merged.source = single.result.source;
    }

    debug!(
        contributors = outputs.len(),
        confidence = merged.confidence,
        field_type = ?merged.field_type,
        source = %merged.source,
        "Merge complete"
    );

    merged
}
