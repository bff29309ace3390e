//! Model response parsing
//!
//! Models wrap their JSON in prose or code fences, so the parser takes the
//! greedy `{...}` span (first `{` through last `}`) and decodes that.

use crate::types::{
    clamp_confidence, EnhanceError, EnhancementResult, EnhancementSource, ValidationSpec,
};
use serde::Deserialize;

/// Confidence assumed when the model omits it
pub const DEFAULT_MODEL_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelFieldResponse {
    #[serde(default, alias = "field_type", alias = "type")]
    field_type: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    validation: Option<ModelValidation>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelValidation {
    pattern: Option<String>,
    #[serde(alias = "min_length")]
    min_length: Option<u32>,
    #[serde(alias = "max_length")]
    max_length: Option<u32>,
    min: Option<f64>,
    max: Option<f64>,
    required: Option<bool>,
    message: Option<String>,
}

impl ModelValidation {
    fn into_validation(self) -> Option<ValidationSpec> {
        let validation = ValidationSpec {
            pattern: self.pattern.filter(|p| !p.trim().is_empty()),
            min_length: self.min_length,
            max_length: self.max_length,
            min: self.min,
            max: self.max,
            required: self.required.unwrap_or(false),
            message: self.message.filter(|m| !m.trim().is_empty()),
        };
        if validation.is_empty() && validation.message.is_none() {
            None
        } else {
            Some(validation)
        }
    }
}

/// Parse raw model text into a model-sourced result
///
/// # Errors
/// - `Parse` when no `{...}` span exists or it is not valid JSON
/// - `UnusableResponse` when neither `fieldType` nor `label` is present
pub fn parse_model_response(text: &str) -> Result<EnhancementResult, EnhanceError> {
    let json = greedy_json_span(text)
        .ok_or_else(|| EnhanceError::Parse("no JSON object in model response".to_string()))?;

    let parsed: ModelFieldResponse = serde_json::from_str(json)
        .map_err(|e| EnhanceError::Parse(format!("invalid JSON in model response: {}", e)))?;

    let field_type = parsed.field_type.filter(|t| !t.trim().is_empty());
    let label = parsed.label.filter(|l| !l.trim().is_empty());
    if field_type.is_none() && label.is_none() {
        return Err(EnhanceError::UnusableResponse(
            "response has neither fieldType nor label".to_string(),
        ));
    }

    let mut result = EnhancementResult::with_confidence(
        clamp_confidence(parsed.confidence.unwrap_or(DEFAULT_MODEL_CONFIDENCE)),
        EnhancementSource::Model,
    );
    result.field_type = field_type;
    result.label = label;
    result.validation = parsed.validation.and_then(ModelValidation::into_validation);
    Ok(result)
}

/// Equivalent of the greedy dot-all match `\{.*\}`
fn greedy_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
