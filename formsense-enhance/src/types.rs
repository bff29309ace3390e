//! Core Types and Trait Definitions for formsense-enhance
//!
//! Defines the data model shared by every stage of the enhancement pipeline:
//! - **Input:** `FieldContext` (element descriptor + surrounding page context)
//! - **Enhancers:** `FieldEnhancer` trait (rule-based, model-backed, custom)
//! - **Output:** `EnhancementResult` (confidence-scored, source-tagged)
//!
//! All types serialize as camelCase JSON, the shape the page analyzer emits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The generic input type that carries no semantic information
pub const DEFAULT_INPUT_TYPE: &str = "text";

// ============================================================================
// Input: Field Context
// ============================================================================

/// Everything known about a single input element itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDescriptor {
    /// Declared `type` attribute (`text`, `email`, `file`, ...)
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    /// Current value at analysis time
    pub value: Option<String>,
    /// Text of the associated `<label>`
    pub label: Option<String>,
    pub aria_label: Option<String>,
    /// `autocomplete` token (e.g. `given-name`, `email`)
    pub autocomplete: Option<String>,
    /// Declared `pattern` attribute
    pub pattern: Option<String>,
    pub required: bool,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
}

impl ElementDescriptor {
    /// Declared type, or `None` when absent, empty or the generic default
    pub fn specific_type(&self) -> Option<&str> {
        non_empty(&self.input_type).filter(|t| !t.eq_ignore_ascii_case(DEFAULT_INPUT_TYPE))
    }
}

/// Snapshot of one input plus its surroundings, taken when the page is analyzed
///
/// Read-only for enhancers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldContext {
    pub element: ElementDescriptor,
    /// Nearby visible text, most relevant first
    pub surrounding_text: Vec<String>,
    /// Other fields of the same form
    pub sibling_fields: Vec<ElementDescriptor>,
    /// Identity of the owning form (id, name or action)
    pub form_id: Option<String>,
    pub page_title: Option<String>,
    pub page_url: Option<String>,
}

impl FieldContext {
    /// Context with only an element descriptor
    pub fn for_element(element: ElementDescriptor) -> Self {
        Self {
            element,
            ..Default::default()
        }
    }
}

/// Borrow a non-blank string out of an optional attribute
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// Output: Enhancement Result
// ============================================================================

/// Which method produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementSource {
    /// Static pattern rules
    Rule,
    /// Remote model inference
    Model,
    /// Served from the enhancement cache
    Cache,
    /// Blend of several contributors
    Hybrid,
}

impl EnhancementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementSource::Rule => "rule",
            EnhancementSource::Model => "model",
            EnhancementSource::Cache => "cache",
            EnhancementSource::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for EnhancementSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation rules for a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSpec {
    pub pattern: Option<String>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    /// Numeric lower bound
    pub min: Option<f64>,
    /// Numeric upper bound
    pub max: Option<f64>,
    pub required: bool,
    /// Human-readable message shown when validation fails
    pub message: Option<String>,
}

impl ValidationSpec {
    /// True when no rule is set
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && !self.required
    }
}

/// Output of a single enhancer or of the merge step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementResult {
    /// Semantic field type (`email`, `phone`, `creditcard`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSpec>,
    /// Confidence score (0.0-1.0); 0.0 means "no opinion"
    pub confidence: f32,
    pub source: EnhancementSource,
    /// Enhancer-specific diagnostics
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl EnhancementResult {
    /// Result carrying no opinion
    pub fn empty(source: EnhancementSource) -> Self {
        Self {
            field_type: None,
            label: None,
            validation: None,
            confidence: 0.0,
            source,
            metadata: Map::new(),
        }
    }

    /// Empty result with a clamped confidence
    pub fn with_confidence(confidence: f32, source: EnhancementSource) -> Self {
        Self {
            confidence: clamp_confidence(confidence),
            ..Self::empty(source)
        }
    }

    pub fn field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn validation(mut self, validation: ValidationSpec) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True when none of type, label or validation is set
    pub fn is_blank(&self) -> bool {
        self.field_type.is_none() && self.label.is_none() && self.validation.is_none()
    }
}

/// Clamp to 0.0-1.0, mapping NaN to 0.0
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Coarse classification of a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    None,
}

// ============================================================================
// Enhancer Trait
// ============================================================================

/// A pluggable classifier contributing an opinion about a field
///
/// Enhancers are stateless with respect to a single request, but may hold
/// long-lived state such as a transport handle.
///
/// # Example
/// ```rust,ignore
/// use formsense_enhance::types::*;
///
/// pub struct HiddenFieldEnhancer;
///
/// #[async_trait::async_trait]
/// impl FieldEnhancer for HiddenFieldEnhancer {
///     fn name(&self) -> &'static str { "hidden" }
///     fn priority(&self) -> u32 { 5 }
///     fn can_enhance(&self, ctx: &FieldContext) -> bool {
///         ctx.element.input_type.as_deref() == Some("hidden")
///     }
///     async fn enhance(
///         &self,
///         _ctx: &FieldContext,
///     ) -> Result<Option<EnhancementResult>, EnhanceError> {
///         let result = EnhancementResult::with_confidence(1.0, EnhancementSource::Rule);
///         Ok(Some(result.field_type("hidden")))
///     }
/// }
/// ```
#[async_trait]
pub trait FieldEnhancer: Send + Sync {
    /// Enhancer name for provenance tracking and lookup
    fn name(&self) -> &'static str;

    /// Lower values are ordered first; also decides confidence ties during merge
    fn priority(&self) -> u32;

    /// Whether the enhancer currently participates
    fn is_enabled(&self) -> bool {
        true
    }

    /// Toggle participation; enhancers without a switch ignore this
    fn set_enabled(&self, _enabled: bool) {}

    /// Whether there is enough signal in `ctx` to attempt enhancement
    fn can_enhance(&self, ctx: &FieldContext) -> bool;

    /// Produce an enhancement for `ctx`
    ///
    /// `Ok(None)` means the enhancer declined.
    ///
    /// # Errors
    /// Any error is isolated by the orchestrator and treated as "no contribution".
    async fn enhance(&self, ctx: &FieldContext) -> Result<Option<EnhancementResult>, EnhanceError>;
}

/// Enhancer-local failure
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// Transport failure talking to the inference host
    #[error("Network error: {0}")]
    Network(String),

    /// Inference host answered with an error status
    #[error("API error: {0}")]
    Api(String),

    /// Inference call exceeded its deadline
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response decoded but carried neither field type nor label
    #[error("Unusable response: {0}")]
    UnusableResponse(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_type_ignores_generic_default() {
        let mut element = ElementDescriptor::default();
        assert_eq!(element.specific_type(), None);

        element.input_type = Some("TEXT".into());
        assert_eq!(element.specific_type(), None);

        element.input_type = Some("email".into());
        assert_eq!(element.specific_type(), Some("email"));
    }

    #[test]
    fn test_context_deserializes_from_page_analyzer_json() {
        let json = r#"{
            "element": {
                "type": "tel", "name": "mobile", "ariaLabel": "Mobile",
                "required": true, "maxLength": 15
            },
            "surroundingText": ["Contact details"],
            "pageTitle": "Apply"
        }"#;

        let ctx: FieldContext = serde_json::from_str(json).unwrap();

        assert_eq!(ctx.element.input_type.as_deref(), Some("tel"));
        assert_eq!(ctx.element.aria_label.as_deref(), Some("Mobile"));
        assert!(ctx.element.required);
        assert_eq!(ctx.element.max_length, Some(15));
        assert_eq!(ctx.surrounding_text, vec!["Contact details".to_string()]);
        assert!(ctx.sibling_fields.is_empty());
    }

    #[test]
    fn test_result_serializes_source_lowercase() {
        let result =
            EnhancementResult::with_confidence(0.5, EnhancementSource::Hybrid).label("Email");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["source"], "hybrid");
        assert_eq!(json["label"], "Email");
        assert!(json.get("fieldType").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }
}
