//! Sanitizer: turns raw classifier text into candidate update records.
//!
//! Strict on syntax, lenient on shape: text that is not JSON is a
//! `ParseFailure`, but valid JSON that is not an array is treated as
//! "nothing to update".

use serde_json::Value;
use tracing::warn;

use crate::error::PipelineError;

const FENCE: &str = "```";

/// One untrusted element of the classifier's reply array.
///
/// Neither the identifier nor the label has been checked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityCandidate(Value);

impl PriorityCandidate {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The raw `id` field, if this candidate is an object that has one.
    pub fn id_field(&self) -> Option<&Value> {
        self.0.as_object().and_then(|obj| obj.get("id"))
    }

    /// The raw `priority` field, if this candidate is an object that has one.
    pub fn label_field(&self) -> Option<&Value> {
        self.0.as_object().and_then(|obj| obj.get("priority"))
    }
}

/// Strip a surrounding markdown code fence, if the text starts with one.
///
/// Drops the opening marker (and a language tag such as `json` on the same
/// line) plus everything from the last closing marker onward.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let (first_line, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
    let is_language_tag = first_line
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    let body = if is_language_tag {
        remainder
    } else {
        strip_inline_tag(rest)
    };

    let body = match body.rfind(FENCE) {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Drop a tag glued to the opening marker (```` ```json[ ````). A bare word
/// with no JSON start after it is the payload itself (```` ```true``` ````).
fn strip_inline_tag(rest: &str) -> &str {
    let after = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    match after.chars().next() {
        Some(c) if c.is_whitespace() || c == '[' || c == '{' => after,
        _ => rest,
    }
}

/// Parse a classifier reply into candidates.
pub fn sanitize_reply(raw: &str) -> Result<Vec<PriorityCandidate>, PipelineError> {
    let cleaned = strip_code_fence(raw);

    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| PipelineError::ParseFailure(e.to_string()))?;

    match value {
        Value::Array(items) => Ok(items.into_iter().map(PriorityCandidate::new).collect()),
        other => {
            warn!(
                kind = json_kind(&other),
                "Classifier reply is not an array, treating as empty"
            );
            Ok(Vec::new())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = r#"[{"id": 1, "priority": "High"}, {"id": 2, "priority": "Low"}]"#;

    #[test]
    fn bare_array_parses() {
        let candidates = sanitize_reply(BARE).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id_field(), Some(&Value::from(1)));
    }

    #[test]
    fn fenced_reply_matches_unfenced() {
        let expected = sanitize_reply(BARE).unwrap();
        for fenced in [
            format!("```json\n{BARE}\n```"),
            format!("```\n{BARE}\n```"),
            format!("  ```json\n{BARE}\n```\n\n"),
            format!("```json{BARE}```"),
            format!("```{BARE}```"),
            format!("```json\n{BARE}\n```\nHope this helps!"),
        ] {
            assert_eq!(sanitize_reply(&fenced).unwrap(), expected, "input: {fenced:?}");
        }

        for literal in ["true", "false", "null", "42", "\"High\""] {
            let bare = sanitize_reply(literal).unwrap();
            for fenced in [
                format!("```{literal}```"),
                format!("```json {literal}```"),
                format!("```\n{literal}\n```"),
            ] {
                assert_eq!(sanitize_reply(&fenced).unwrap(), bare, "input: {fenced:?}");
            }
        }
    }

    #[test]
    fn inline_tag_needs_json_after_it() {
        assert_eq!(strip_code_fence("```true```"), "true");
        assert_eq!(strip_code_fence("```json [1]```"), "[1]");
        assert_eq!(strip_code_fence("```json{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn strip_uses_last_closing_fence() {
        let text = "```json\n[\"a```b\"]\n```";
        assert_eq!(strip_code_fence(text), "[\"a```b\"]");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fence("  [1, 2]\n"), "[1, 2]");
    }

    #[test]
    fn non_array_yields_empty() {
        for reply in [
            r#"{"id": 1, "priority": "High"}"#,
            "42",
            "\"High\"",
            "null",
            "true",
        ] {
            assert!(sanitize_reply(reply).unwrap().is_empty(), "input: {reply}");
        }
    }

    #[test]
    fn syntax_error_is_parse_failure() {
        for reply in ["Sure! Here are your priorities.", "[{\"id\": 1,", "", "```json\n```"] {
            let err = sanitize_reply(reply).unwrap_err();
            assert!(matches!(err, PipelineError::ParseFailure(_)), "input: {reply:?}");
        }
    }

    #[test]
    fn non_object_elements_are_kept_as_candidates() {
        let candidates = sanitize_reply(r#"[1, "x", {"id": 3}]"#).unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates[0].id_field().is_none());
        assert!(candidates[2].label_field().is_none());
    }
}
