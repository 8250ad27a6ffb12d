//! Directive classifier.
//!
//! Scans a model's raw output for an embedded JSON directive object and
//! decides whether the output is a plain answer, a notification directive,
//! or a malformed directive attempt. The directive schema is a single
//! brace-delimited object whose `"function"` field equals `"send_email"`,
//! carrying `to`, `subject`, and `body`.

use contextbot_core::types::EmailDirective;

/// Field name that marks a JSON fragment as a directive.
const DIRECTIVE_MARKER: &str = "\"function\"";

/// Function name this system dispatches.
const DIRECTIVE_FUNCTION: &str = "send_email";

/// What the classifier decided about a model output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// No directive fragment found; the text is the answer, verbatim.
    Answer(String),
    /// A well-formed directive; surrounding prose is discarded.
    Directive(EmailDirective),
    /// Directive marker present but the fragment does not parse.
    Malformed,
}

/// Classify a model output.
pub fn classify(output: &str) -> Classification {
    if !output.contains(DIRECTIVE_MARKER) {
        return Classification::Answer(output.to_string());
    }

    let mut saw_broken_fragment = false;
    let mut saw_directive_fragment = false;

    for fragment in brace_fragments(output) {
        if !fragment.contains(DIRECTIVE_MARKER) {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(fragment) {
            Ok(value) => {
                if value.get("function").and_then(|v| v.as_str()) != Some(DIRECTIVE_FUNCTION) {
                    continue;
                }
                saw_directive_fragment = true;
                match serde_json::from_value::<EmailDirective>(value) {
                    Ok(directive) => {
                        tracing::debug!(to = %directive.to, "Directive found in model output");
                        return Classification::Directive(directive);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Directive fragment missing required fields");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable directive fragment in model output");
                saw_broken_fragment = true;
            }
        }
    }

    if saw_directive_fragment || saw_broken_fragment {
        return Classification::Malformed;
    }
    // The marker appears but no balanced fragment contains it, which means
    // the directive object was truncated mid-stream.
    if output.contains(DIRECTIVE_FUNCTION) {
        return Classification::Malformed;
    }
    Classification::Answer(output.to_string())
}

/// Top-level balanced `{...}` substrings, honoring JSON string literals.
fn brace_fragments(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut fragments = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = matching_brace(bytes, i) {
                fragments.push(&text[i..=end]);
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    fragments
}

/// Index of the brace closing the one at `start`, if balanced.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Plain answers ----

    #[test]
    fn test_plain_text_is_answer() {
        let output = "The warranty period is 12 months.";
        assert_eq!(
            classify(output),
            Classification::Answer(output.to_string())
        );
    }

    #[test]
    fn test_answer_with_unrelated_braces() {
        let output = "Set the config to {\"level\": \"debug\"} and restart.";
        assert_eq!(
            classify(output),
            Classification::Answer(output.to_string())
        );
    }

    #[test]
    fn test_fragment_with_other_function_is_answer() {
        let output = r#"Call {"function": "lookup", "key": "k"} for details."#;
        assert_eq!(
            classify(output),
            Classification::Answer(output.to_string())
        );
    }

    // ---- Directives ----

    #[test]
    fn test_well_formed_directive_parsed() {
        let output = r#"{"function": "send_email", "to": "a@b.com", "subject": "S", "body": "B"}"#;
        let expected = EmailDirective {
            to: "a@b.com".to_string(),
            subject: "S".to_string(),
            body: "B".to_string(),
        };
        assert_eq!(classify(output), Classification::Directive(expected));
    }

    #[test]
    fn test_directive_with_surrounding_prose() {
        let output = concat!(
            "Sure, sending that now:\n",
            r#"{"function": "send_email", "to": "a@b.com", "subject": "Update", "body": "Done."}"#,
            "\nLet me know if you need anything else."
        );
        match classify(output) {
            Classification::Directive(d) => {
                assert_eq!(d.to, "a@b.com");
                assert_eq!(d.subject, "Update");
                assert_eq!(d.body, "Done.");
            }
            other => panic!("expected directive, got {:?}", other),
        }
    }

    #[test]
    fn test_directive_body_may_contain_braces() {
        let output = r#"{"function": "send_email", "to": "a@b.com", "subject": "S", "body": "use {placeholders} here"}"#;
        match classify(output) {
            Classification::Directive(d) => assert_eq!(d.body, "use {placeholders} here"),
            other => panic!("expected directive, got {:?}", other),
        }
    }

    // ---- Malformed directives ----

    #[test]
    fn test_truncated_directive_is_malformed() {
        let output = r#"{"function": "send_email", "to": "a@b.com", "subject":"#;
        assert_eq!(classify(output), Classification::Malformed);
    }

    #[test]
    fn test_directive_missing_fields_is_malformed() {
        let output = r#"{"function": "send_email", "to": "a@b.com"}"#;
        assert_eq!(classify(output), Classification::Malformed);
    }

    #[test]
    fn test_invalid_json_inside_braces_is_malformed() {
        let output = r#"{"function": send_email, to: a@b.com}"#;
        assert_eq!(classify(output), Classification::Malformed);
    }
}
