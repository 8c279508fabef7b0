//! Eligibility Filter
//!
//! Decides whether a focused element may open the action menu. Text from a
//! sensitive field is never captured, so never transmitted.

use lazy_static::lazy_static;
use regex::Regex;

use crate::dom::Element;

/// Input types that are not text entry
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "button", "submit", "reset", "checkbox", "radio", "file", "image", "hidden",
];

/// Input types that always carry personal or credential data
const SENSITIVE_TYPES: &[&str] = &["password", "email", "tel", "credit-card", "ssn"];

/// Autocomplete hints for stored credentials and payment fields
const SENSITIVE_AUTOCOMPLETE: &[&str] = &[
    "current-password",
    "new-password",
    "one-time-code",
    "cc-number",
    "cc-csc",
    "cc-exp",
];

lazy_static! {
    /// Substrings of name/id/placeholder that mark a field as sensitive
    static ref SENSITIVE_TERMS: Regex = Regex::new(
        r"(?i)password|passwd|secret|token|api[\s_-]?key|credit|card|cvv|ssn|social"
    )
    .expect("sensitive term pattern is valid");
}

/// What an element can do with a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `<input>` or `<textarea>`: value with offset-based selection
    PlainControl,
    /// Content-editable region: live DOM selection
    RichTextRegion,
    NotEditable,
}

/// Result of checking a focused element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub editable: bool,
    pub sensitive: bool,
}

impl Eligibility {
    /// The menu may open only for editable, non-sensitive elements
    pub fn allows_menu(&self) -> bool {
        self.editable && !self.sensitive
    }
}

/// Classify an element by how its selection is read and replaced
pub fn classify(element: &Element) -> Capability {
    match element.tag.as_str() {
        "input" => {
            let input_type = element
                .input_type
                .as_deref()
                .unwrap_or("text")
                .to_lowercase();
            if NON_TEXT_INPUT_TYPES.contains(&input_type.as_str()) {
                Capability::NotEditable
            } else {
                Capability::PlainControl
            }
        }
        "textarea" => Capability::PlainControl,
        _ if element.content_editable => Capability::RichTextRegion,
        _ => Capability::NotEditable,
    }
}

/// Check whether an element looks like it holds credentials or personal data
pub fn is_sensitive(element: &Element) -> bool {
    if let Some(input_type) = element.input_type.as_deref() {
        if SENSITIVE_TYPES.contains(&input_type.to_lowercase().as_str()) {
            return true;
        }
    }

    if let Some(autocomplete) = element.autocomplete.as_deref() {
        let autocomplete = autocomplete.to_lowercase();
        if SENSITIVE_AUTOCOMPLETE
            .iter()
            .any(|hint| autocomplete.contains(hint))
        {
            return true;
        }
    }

    [&element.name, &element.id, &element.placeholder]
        .iter()
        .any(|attr| SENSITIVE_TERMS.is_match(attr))
}

pub fn check(element: &Element) -> Eligibility {
    Eligibility {
        editable: classify(element) != Capability::NotEditable,
        sensitive: is_sensitive(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_inputs() {
        assert_eq!(classify(&Element::input("text", "")), Capability::PlainControl);
        assert_eq!(classify(&Element::input("search", "")), Capability::PlainControl);
        assert_eq!(classify(&Element::textarea("")), Capability::PlainControl);
        for t in NON_TEXT_INPUT_TYPES {
            assert_eq!(classify(&Element::input(t, "")), Capability::NotEditable);
        }
        assert_eq!(classify(&Element::input("CHECKBOX", "")), Capability::NotEditable);
    }

    #[test]
    fn test_classify_rich_and_other() {
        assert_eq!(
            classify(&Element::rich_text(["hi"])),
            Capability::RichTextRegion
        );
        assert_eq!(classify(&Element::other("button")), Capability::NotEditable);
        assert_eq!(classify(&Element::other("div")), Capability::NotEditable);
    }

    #[test]
    fn test_sensitive_types() {
        for t in ["password", "Email", "TEL", "credit-card", "ssn"] {
            let el = Element::input(t, "x");
            assert!(is_sensitive(&el), "{t} should be sensitive");
            assert!(!check(&el).allows_menu());
        }
        assert!(!is_sensitive(&Element::input("text", "x")));
    }

    #[test]
    fn test_sensitive_autocomplete() {
        let el = Element::input("text", "").with_autocomplete("section-billing CC-Number");
        assert!(is_sensitive(&el));
        let el = Element::input("text", "").with_autocomplete("new-password");
        assert!(is_sensitive(&el));
        let el = Element::input("text", "").with_autocomplete("street-address");
        assert!(!is_sensitive(&el));
    }

    #[test]
    fn test_sensitive_terms_any_case() {
        let cases = [
            Element::input("text", "").with_name("user_PASSWORD"),
            Element::textarea("").with_id("GitHubToken"),
            Element::input("text", "").with_placeholder("Your API key"),
            Element::input("text", "").with_name("apikey"),
            Element::input("text", "").with_name("Api-Key"),
            Element::input("text", "").with_id("cardNumber"),
            Element::input("text", "").with_placeholder("CVV"),
            Element::input("text", "").with_name("Social_Security"),
            Element::rich_text(["x"]).with_id("client-secret"),
        ];
        for el in &cases {
            assert!(is_sensitive(el), "{el:?} should be sensitive");
            assert!(!check(el).allows_menu());
        }
    }

    #[test]
    fn test_plain_field_is_eligible() {
        let el = Element::textarea("notes").with_name("comment").with_placeholder("Write a reply");
        let e = check(&el);
        assert!(e.editable);
        assert!(!e.sensitive);
        assert!(e.allows_menu());
    }
}
