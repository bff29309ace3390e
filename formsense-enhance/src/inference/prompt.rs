//! Field-classification prompt construction

use crate::types::{non_empty, ElementDescriptor, FieldContext};
use std::fmt::Write;

/// Surrounding text snippets included in the prompt
const MAX_SURROUNDING_SNIPPETS: usize = 5;

/// Sibling fields included in the prompt
const MAX_SIBLINGS: usize = 10;

/// Build the prompt asking the model to classify one field as strict JSON
pub fn build_field_prompt(ctx: &FieldContext) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are analyzing a single input field on a web form (for example a job application).\n\
         Determine what information the field expects.\n\n",
    );

    prompt.push_str("Field attributes:\n");
    describe_element(&mut prompt, &ctx.element);

    let snippets: Vec<&str> = ctx
        .surrounding_text
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(MAX_SURROUNDING_SNIPPETS)
        .collect();
    if !snippets.is_empty() {
        prompt.push_str("\nNearby text (most relevant first):\n");
        for snippet in snippets {
            let _ = writeln!(prompt, "- {}", snippet);
        }
    }

    if !ctx.sibling_fields.is_empty() {
        prompt.push_str("\nOther fields in the same form:\n");
        for sibling in ctx.sibling_fields.iter().take(MAX_SIBLINGS) {
            let _ = writeln!(prompt, "- {}", sibling_summary(sibling));
        }
    }

    let form_lines: Vec<(&str, &str)> = [
        ("Form", non_empty(&ctx.form_id)),
        ("Page title", non_empty(&ctx.page_title)),
        ("Page URL", non_empty(&ctx.page_url)),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| (k, v)))
    .collect();
    if !form_lines.is_empty() {
        prompt.push_str("\nForm context:\n");
        for (key, value) in form_lines {
            let _ = writeln!(prompt, "- {}: {}", key, value);
        }
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON object, no prose, in exactly this shape:\n\
         {\"fieldType\": \"email|phone|first_name|last_name|full_name|url|resume|address|city|state|zip|country|company|job_title|date|number|text|...\",\n \
         \"label\": \"short human-readable label\",\n \
         \"validation\": {\"pattern\": \"regex or null\", \"minLength\": null, \"maxLength\": null, \"min\": null, \"max\": null, \"required\": false, \"message\": \"text or null\"},\n \
         \"confidence\": 0.0}\n\
         confidence must be a number between 0 and 1 describing how certain you are.\n",
    );

    prompt
}

fn describe_element(prompt: &mut String, element: &ElementDescriptor) {
    let attributes = [
        ("type", &element.input_type),
        ("name", &element.name),
        ("id", &element.id),
        ("label", &element.label),
        ("aria-label", &element.aria_label),
        ("placeholder", &element.placeholder),
        ("autocomplete", &element.autocomplete),
        ("pattern", &element.pattern),
        ("current value", &element.value),
    ];
    for (key, value) in attributes {
        if let Some(value) = non_empty(value) {
            let _ = writeln!(prompt, "- {}: {}", key, value);
        }
    }
    if element.required {
        prompt.push_str("- required: true\n");
    }
    if let Some(min) = element.min_length {
        let _ = writeln!(prompt, "- minlength: {}", min);
    }
    if let Some(max) = element.max_length {
        let _ = writeln!(prompt, "- maxlength: {}", max);
    }
}

fn sibling_summary(sibling: &ElementDescriptor) -> String {
    let name = non_empty(&sibling.label)
        .or_else(|| non_empty(&sibling.name))
        .or_else(|| non_empty(&sibling.id))
        .unwrap_or("(unnamed)");
    match non_empty(&sibling.input_type) {
        Some(t) => format!("{} ({})", name, t),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_context() {
        let ctx = FieldContext {
            element: ElementDescriptor {
                input_type: Some("text".into()),
                name: Some("applicant_mobile".into()),
                required: true,
                ..Default::default()
            },
            surrounding_text: vec!["Mobile number".into(), "  ".into()],
            sibling_fields: vec![ElementDescriptor {
                name: Some("email".into()),
                input_type: Some("email".into()),
                ..Default::default()
            }],
            page_title: Some("Careers - Apply".into()),
            ..Default::default()
        };

        let prompt = build_field_prompt(&ctx);

        assert!(prompt.contains("- name: applicant_mobile"));
        assert!(prompt.contains("- required: true"));
        assert!(prompt.contains("- Mobile number"));
        assert!(prompt.contains("- email (email)"));
        assert!(prompt.contains("- Page title: Careers - Apply"));
        assert!(prompt.contains("\"fieldType\""));
        assert!(!prompt.contains("Page URL"));
    }

    #[test]
    fn test_surrounding_text_is_capped() {
        let ctx = FieldContext {
            surrounding_text: (0..20).map(|i| format!("snippet {}", i)).collect(),
            ..Default::default()
        };

        let prompt = build_field_prompt(&ctx);

        assert!(prompt.contains("snippet 4"));
        assert!(!prompt.contains("snippet 5"));
    }
}
