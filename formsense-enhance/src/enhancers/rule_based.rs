//! Rule-based Enhancer
//!
//! Classifies fields with static tables only; no I/O. Always applicable, so it
//! is the fallback of last resort when no other enhancer contributes.
//!
//! # Confidence Scoring
//! Each sub-decision carries its own ceiling and the result takes the maximum:
//! - type detected → 0.8
//! - label extracted → 0.9
//! - validation inferred → 0.7

use super::patterns::{
    autocomplete_type, default_validation, normalize_declared_type, TYPE_PATTERNS,
};
use crate::types::{
    non_empty, EnhanceError, EnhancementResult, EnhancementSource, FieldContext, FieldEnhancer,
    ValidationSpec,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

/// Enhancer name used for registration and lookup
pub const RULE_ENHANCER_NAME: &str = "rule";

const TYPE_CONFIDENCE: f32 = 0.8;
const LABEL_CONFIDENCE: f32 = 0.9;
const VALIDATION_CONFIDENCE: f32 = 0.7;

/// How the field type was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    DeclaredType,
    TextPattern,
    Autocomplete,
    PatternReverseMatch,
}

impl DetectionMethod {
    fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::DeclaredType => "declaredType",
            DetectionMethod::TextPattern => "textPattern",
            DetectionMethod::Autocomplete => "autocomplete",
            DetectionMethod::PatternReverseMatch => "patternReverseMatch",
        }
    }
}

/// Runs after enhancers with richer signal
const RULE_PRIORITY: u32 = 100;

/// Pattern-table field classifier
pub struct RuleBasedEnhancer;

impl RuleBasedEnhancer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous classification; `None` if nothing could be determined
    pub fn classify(&self, ctx: &FieldContext) -> Option<EnhancementResult> {
        let detected = detect_type(ctx);
        let label = extract_label(ctx);
        let validation = infer_validation(ctx, detected.as_ref().map(|(t, _)| t.as_str()));

        let mut result = EnhancementResult::empty(EnhancementSource::Rule);
        if let Some((field_type, method)) = detected {
            result.confidence = result.confidence.max(TYPE_CONFIDENCE);
            result.field_type = Some(field_type);
            result = result.meta("detectedBy", method.as_str());
        }
        if let Some(label) = label {
            result.confidence = result.confidence.max(LABEL_CONFIDENCE);
            result.label = Some(label);
        }
        if let Some(validation) = validation {
            result.confidence = result.confidence.max(VALIDATION_CONFIDENCE);
            result.validation = Some(validation);
        }

        if result.is_blank() {
            return None;
        }

        debug!(
            field_type = ?result.field_type,
            label = ?result.label,
            confidence = result.confidence,
            "Rule-based classification complete"
        );
        Some(result)
    }
}

impl Default for RuleBasedEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FieldEnhancer for RuleBasedEnhancer {
    fn name(&self) -> &'static str {
        RULE_ENHANCER_NAME
    }

    fn priority(&self) -> u32 {
        RULE_PRIORITY
    }

    fn can_enhance(&self, _ctx: &FieldContext) -> bool {
        true
    }

    async fn enhance(&self, ctx: &FieldContext) -> Result<Option<EnhancementResult>, EnhanceError> {
        Ok(self.classify(ctx))
    }
}

// ============================================================================
// Type detection
// ============================================================================

/// Detect the semantic type, trying each method in order
pub fn detect_type(ctx: &FieldContext) -> Option<(String, DetectionMethod)> {
    let element = &ctx.element;

    if let Some(declared) = element.specific_type() {
        return Some((normalize_declared_type(declared), DetectionMethod::DeclaredType));
    }

    let text = accumulated_text(ctx);
    if !text.is_empty() {
        for (field_type, regexes) in TYPE_PATTERNS.iter() {
            if regexes.iter().any(|re| re.is_match(&text)) {
                return Some((field_type.to_string(), DetectionMethod::TextPattern));
            }
        }
    }

    if let Some(field_type) = non_empty(&element.autocomplete).and_then(autocomplete_type) {
        return Some((field_type.to_string(), DetectionMethod::Autocomplete));
    }

    non_empty(&element.pattern)
        .and_then(reverse_match)
        .map(|field_type| (field_type.to_string(), DetectionMethod::PatternReverseMatch))
}

/// name, id, label, placeholder and aria-label joined by spaces
fn accumulated_text(ctx: &FieldContext) -> String {
    let e = &ctx.element;
    [&e.name, &e.id, &e.label, &e.placeholder, &e.aria_label]
        .into_iter()
        .filter_map(non_empty)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find a detection regex whose source text contains the field's own pattern
///
/// A pattern that does not compile is skipped.
fn reverse_match(pattern: &str) -> Option<&'static str> {
    if let Err(e) = Regex::new(pattern) {
        debug!(
            pattern = %pattern,
            error = %e,
            "Field pattern is not a valid regex, skipping reverse match"
        );
        return None;
    }

    TYPE_PATTERNS
        .iter()
        .find(|(_, regexes)| regexes.iter().any(|re| re.as_str().contains(pattern)))
        .map(|(field_type, _)| *field_type)
}

// ============================================================================
// Label extraction
// ============================================================================

/// Pick the best human-readable label
pub fn extract_label(ctx: &FieldContext) -> Option<String> {
    let element = &ctx.element;

    if let Some(label) = non_empty(&element.label) {
        if !label.contains("field") {
            return Some(label.to_string());
        }
    }

    if let Some(aria) = non_empty(&element.aria_label) {
        return Some(aria.to_string());
    }

    if let Some(snippet) = ctx
        .surrounding_text
        .iter()
        .map(|s| s.trim())
        .find(|s| is_label_shaped(s))
    {
        return Some(snippet.to_string());
    }

    if let Some(placeholder) = non_empty(&element.placeholder) {
        if placeholder.chars().count() > 2 && !looks_like_example_value(placeholder) {
            return Some(placeholder.to_string());
        }
    }

    non_empty(&element.name)
        .map(humanize)
        .filter(|s| !s.is_empty())
}

fn is_label_shaped(text: &str) -> bool {
    let len = text.chars().count();
    len > 2 && len < 50 && !text.contains('*')
}

/// Placeholders like `you@example.com` show a sample value, not a caption
fn looks_like_example_value(placeholder: &str) -> bool {
    let lower = placeholder.to_lowercase();
    lower.contains('@')
        || lower.contains("://")
        || lower.starts_with("e.g")
        || lower.starts_with("ex:")
}

/// `first_name`, `first-name`, `firstName` → `First Name`
pub fn humanize(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ============================================================================
// Validation inference
// ============================================================================

/// Declared constraints overlaid with the detected type's defaults
pub fn infer_validation(ctx: &FieldContext, field_type: Option<&str>) -> Option<ValidationSpec> {
    let element = &ctx.element;
    let mut validation = ValidationSpec {
        pattern: non_empty(&element.pattern).map(str::to_string),
        min_length: element.min_length,
        max_length: element.max_length,
        required: element.required,
        ..Default::default()
    };

    if validation.pattern.is_none() {
        if let Some(defaults) = field_type.and_then(default_validation) {
            validation.pattern = defaults.pattern;
            validation.message = defaults.message;
            validation.min_length = validation.min_length.or(defaults.min_length);
            validation.max_length = validation.max_length.or(defaults.max_length);
        }
    }

    if validation.is_empty() {
        None
    } else {
        Some(validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementDescriptor;

    fn ctx(element: ElementDescriptor) -> FieldContext {
        FieldContext::for_element(element)
    }

    #[test]
    fn test_email_by_name_gets_humanized_label() {
        let ctx = ctx(ElementDescriptor {
            name: Some("email".into()),
            label: Some("".into()),
            placeholder: Some("you@example.com".into()),
            ..Default::default()
        });

        let result = RuleBasedEnhancer::new().classify(&ctx).unwrap();

        assert_eq!(result.field_type.as_deref(), Some("email"));
        assert_eq!(result.label.as_deref(), Some("Email"));
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.source, EnhancementSource::Rule);
        assert_eq!(result.metadata["detectedBy"], "textPattern");
        let validation = result.validation.unwrap();
        assert!(validation.pattern.unwrap().contains('@'));
    }

    #[test]
    fn test_declared_type_trusted_outright() {
        let ctx = ctx(ElementDescriptor {
            input_type: Some("tel".into()),
            name: Some("email_backup".into()),
            ..Default::default()
        });

        let (field_type, method) = detect_type(&ctx).unwrap();

        assert_eq!(field_type, "phone");
        assert_eq!(method, DetectionMethod::DeclaredType);
    }

    #[test]
    fn test_email_wins_over_number() {
        let ctx = ctx(ElementDescriptor {
            name: Some("email_number_2".into()),
            ..Default::default()
        });
        assert_eq!(detect_type(&ctx).unwrap().0, "email");
    }

    #[test]
    fn test_autocomplete_fallback() {
        let ctx = ctx(ElementDescriptor {
            name: Some("f7".into()),
            autocomplete: Some("postal-code".into()),
            ..Default::default()
        });

        assert_eq!(
            detect_type(&ctx),
            Some(("zip".to_string(), DetectionMethod::Autocomplete))
        );
    }

    #[test]
    fn test_pattern_reverse_match() {
        let ctx = ctx(ElementDescriptor {
            name: Some("q1".into()),
            pattern: Some("linkedin".into()),
            ..Default::default()
        });

        assert_eq!(
            detect_type(&ctx),
            Some(("url".to_string(), DetectionMethod::PatternReverseMatch))
        );
    }

    #[test]
    fn test_malformed_pattern_skips_reverse_match() {
        let ctx = ctx(ElementDescriptor {
            name: Some("q1".into()),
            pattern: Some("([a-z".into()),
            ..Default::default()
        });

        assert_eq!(detect_type(&ctx), None);
    }

    #[test]
    fn test_label_containing_field_is_rejected() {
        let ctx = FieldContext {
            element: ElementDescriptor {
                label: Some("input field 3".into()),
                aria_label: Some("Preferred name".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(extract_label(&ctx).as_deref(), Some("Preferred name"));
    }

    #[test]
    fn test_capitalized_field_in_real_label_kept() {
        let ctx = ctx(ElementDescriptor {
            label: Some("Field of Study".into()),
            name: Some("major".into()),
            ..Default::default()
        });
        assert_eq!(extract_label(&ctx).as_deref(), Some("Field of Study"));
    }

    #[test]
    fn test_qualified_name_labels_detect_their_noun() {
        let detected = |label: &str| {
            detect_type(&ctx(ElementDescriptor {
                label: Some(label.into()),
                ..Default::default()
            }))
            .map(|(t, _)| t)
        };

        assert_eq!(detected("Company Name").as_deref(), Some("company"));
        assert_eq!(detected("Employer name").as_deref(), Some("company"));
        assert_eq!(detected("First Name").as_deref(), Some("first_name"));
        assert_eq!(detected("Name").as_deref(), Some("full_name"));
        assert_eq!(detected("School Name").as_deref(), Some("full_name"));
    }

    #[test]
    fn test_label_from_surrounding_text() {
        let ctx = FieldContext {
            element: ElementDescriptor {
                placeholder: Some("Type here".into()),
                ..Default::default()
            },
            surrounding_text: vec![
                "*".into(),
                "Required fields are marked *".into(),
                "Years of experience".into(),
            ],
            ..Default::default()
        };
        assert_eq!(extract_label(&ctx).as_deref(), Some("Years of experience"));
    }

    #[test]
    fn test_label_from_placeholder() {
        let ctx = ctx(ElementDescriptor {
            placeholder: Some("Your city".into()),
            name: Some("c".into()),
            ..Default::default()
        });
        assert_eq!(extract_label(&ctx).as_deref(), Some("Your city"));
    }

    #[test]
    fn test_example_placeholders_skipped() {
        for placeholder in ["e.g. Acme Corp", "Ex: 12 months", "https://github.com/you"] {
            let ctx = ctx(ElementDescriptor {
                placeholder: Some(placeholder.into()),
                name: Some("answer".into()),
                ..Default::default()
            });
            assert_eq!(extract_label(&ctx).as_deref(), Some("Answer"), "{}", placeholder);
        }
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("first_name"), "First Name");
        assert_eq!(humanize("first-name"), "First Name");
        assert_eq!(humanize("firstName"), "First Name");
        assert_eq!(humanize("EMAIL"), "Email");
    }

    #[test]
    fn test_explicit_pattern_not_overridden() {
        let ctx = ctx(ElementDescriptor {
            input_type: Some("email".into()),
            pattern: Some(".+@corp\\.com".into()),
            required: true,
            ..Default::default()
        });

        let validation = infer_validation(&ctx, Some("email")).unwrap();

        assert_eq!(validation.pattern.as_deref(), Some(".+@corp\\.com"));
        assert_eq!(validation.message, None);
        assert!(validation.required);
    }

    #[test]
    fn test_validation_only_result() {
        let ctx = ctx(ElementDescriptor {
            required: true,
            ..Default::default()
        });

        let result = RuleBasedEnhancer::new().classify(&ctx).unwrap();

        assert_eq!(result.field_type, None);
        assert_eq!(result.label, None);
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_nothing_determinable_returns_none() {
        let ctx = ctx(ElementDescriptor {
            name: Some("q".into()),
            ..Default::default()
        });
        // "q" humanizes to "Q", which is still a label
        assert!(RuleBasedEnhancer::new().classify(&ctx).is_some());

        assert!(RuleBasedEnhancer::new().classify(&FieldContext::default()).is_none());
    }
}
