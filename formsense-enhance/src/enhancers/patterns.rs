//! Static detection tables for the rule-based enhancer
//!
//! Table order matters: the first matching entry wins, so broad patterns
//! (`number`, `address`) come after the specific ones that contain the same
//! words (`phone number`, `email address`, `company name`). A type may appear
//! more than once to split its specific and broad patterns.

use crate::types::ValidationSpec;
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered `field type -> detection regexes` table
pub static TYPE_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("email", &[r"(?i)e-?mail", r"(?i)\bcorreo\b"]),
        ("phone", &[r"(?i)phone|mobile|\btel\b|telephone|\bcell\b"]),
        ("first_name", &[r"(?i)first.?name|given.?name|\bfname\b|forename"]),
        ("last_name", &[r"(?i)last.?name|family.?name|surname|\blname\b"]),
        ("full_name", &[r"(?i)full.?name|your.?name"]),
        ("url", &[r"(?i)linkedin|github|portfolio|website|homepage|\burl\b"]),
        ("resume", &[r"(?i)resume|résumé|\bcv\b|curriculum"]),
        ("cover_letter", &[r"(?i)cover.?letter"]),
        ("zip", &[r"(?i)\bzip|postal|post.?code"]),
        ("city", &[r"(?i)\bcity\b|\btown\b"]),
        ("state", &[r"(?i)\bstate\b|province|\bregion\b"]),
        ("country", &[r"(?i)country|nationality"]),
        ("address", &[r"(?i)address|street"]),
        ("company", &[r"(?i)company|employer|organi[sz]ation"]),
        ("job_title", &[r"(?i)job.?title|position|\brole\b"]),
        // Bare "name" only once the "<noun> name" types above had their turn
        ("full_name", &[r"(?i)\bname\b"]),
        ("creditcard", &[r"(?i)credit.?card|card.?number|\bcc.?num"]),
        ("date", &[r"(?i)\bdate\b|\bdob\b|birth"]),
        ("salary", &[r"(?i)salary|compensation"]),
        ("number", &[r"(?i)number|\bnum\b|\bqty\b|quantity|amount"]),
    ];

    table
        .iter()
        .map(|(field_type, sources)| {
            let regexes = sources
                .iter()
                .filter_map(|source| Regex::new(source).ok())
                .collect();
            (*field_type, regexes)
        })
        .collect()
});

/// Browser-standard autocomplete token -> field type
pub fn autocomplete_type(token: &str) -> Option<&'static str> {
    let field_type = match token.trim().to_ascii_lowercase().as_str() {
        "email" => "email",
        "tel" | "tel-national" | "tel-local" => "phone",
        "given-name" => "first_name",
        "family-name" => "last_name",
        "name" => "full_name",
        "street-address" | "address-line1" | "address-line2" => "address",
        "address-level2" => "city",
        "address-level1" => "state",
        "postal-code" => "zip",
        "country" | "country-name" => "country",
        "organization" => "company",
        "organization-title" => "job_title",
        "cc-number" => "creditcard",
        "url" => "url",
        "bday" => "date",
        _ => return None,
    };
    Some(field_type)
}

/// Map a declared HTML input type onto the semantic vocabulary
pub fn normalize_declared_type(input_type: &str) -> String {
    match input_type.to_ascii_lowercase().as_str() {
        "tel" => "phone".to_string(),
        other => other.to_string(),
    }
}

/// Default validation for a detected type, if the type has one
pub fn default_validation(field_type: &str) -> Option<ValidationSpec> {
    match field_type {
        "email" => Some(ValidationSpec {
            pattern: Some(r"^[^\s@]+@[^\s@]+\.[^\s@]+$".to_string()),
            max_length: Some(254),
            message: Some("Please enter a valid email address".to_string()),
            ..Default::default()
        }),
        "phone" => Some(ValidationSpec {
            pattern: Some(r"^\+?[\d\s().-]{7,20}$".to_string()),
            max_length: Some(20),
            message: Some("Please enter a valid phone number".to_string()),
            ..Default::default()
        }),
        "url" => Some(pattern_only(r"^https?://\S+$", "Please enter a valid URL")),
        "zip" => Some(pattern_only(
            r"^[A-Za-z0-9][A-Za-z0-9 -]{2,9}$",
            "Please enter a valid postal code",
        )),
        "creditcard" => Some(pattern_only(
            r"^[\d\s-]{12,23}$",
            "Please enter a valid card number",
        )),
        "number" => Some(pattern_only(r"^-?\d+(\.\d+)?$", "Please enter a number")),
        _ => None,
    }
}

fn pattern_only(pattern: &str, message: &str) -> ValidationSpec {
    ValidationSpec {
        pattern: Some(pattern.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        for (field_type, regexes) in TYPE_PATTERNS.iter() {
            assert!(!regexes.is_empty(), "{} has no compiled patterns", field_type);
        }
    }

    #[test]
    fn test_email_listed_before_number() {
        let position = |name: &str| TYPE_PATTERNS.iter().position(|(t, _)| *t == name).unwrap();
        assert!(position("email") < position("number"));
        assert!(position("phone") < position("number"));
        assert!(position("creditcard") < position("number"));
    }

    #[test]
    fn test_autocomplete_lookup() {
        assert_eq!(autocomplete_type("given-name"), Some("first_name"));
        assert_eq!(autocomplete_type(" TEL "), Some("phone"));
        assert_eq!(autocomplete_type("off"), None);
    }
}
