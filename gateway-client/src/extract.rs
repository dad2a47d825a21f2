//! Turn an `agent` run envelope into display text.
//!
//! The gateway's run payload has changed shape across versions. Each known
//! shape is a variant of [`RunEnvelope`]; anything else is `Opaque`. Parsing
//! tries the shapes in a fixed order and the first one that yields text wins.

use serde_json::{Map, Value};

/// Shown when a run produced no text at all.
pub const NO_TEXT_PLACEHOLDER: &str = "(No text returned)";

const TEXT_FIELDS: [&str; 3] = ["text", "message", "outputText"];
const SUMMARY_FIELDS: [&str; 3] = ["summary", "output", "content"];
const FRAGMENT_FIELDS: [&str; 2] = ["text", "summary_text"];

#[derive(Debug, Clone, PartialEq)]
pub enum RunEnvelope {
    /// The payload is itself a string.
    Text(String),
    /// A string `text`/`message`/`outputText`, or a string summary.
    Field(String),
    /// A `summary`/`output`/`content` list of text fragments.
    Fragments(Vec<String>),
    /// A `summary`/`output`/`content` object holding another envelope.
    Nested(Box<RunEnvelope>),
    /// `result.payloads[].text`.
    Payloads(Vec<String>),
    /// Nothing recognisable.
    Opaque(Value),
}

impl RunEnvelope {
    pub fn parse(value: &Value) -> Self {
        Self::probe(value).unwrap_or_else(|| RunEnvelope::Opaque(value.clone()))
    }

    /// Recognise a known shape, or `None` if nothing yields text.
    fn probe(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RunEnvelope::Text(s.trim().to_string())),
            Value::Object(map) => Self::probe_object(map),
            _ => None,
        }
    }

    fn probe_object(map: &Map<String, Value>) -> Option<Self> {
        for field in TEXT_FIELDS {
            if let Some(text) = map.get(field).and_then(non_empty_str) {
                return Some(RunEnvelope::Field(text));
            }
        }

        for field in SUMMARY_FIELDS {
            match map.get(field) {
                Some(Value::String(s)) => {
                    if let Some(text) = non_empty(s) {
                        return Some(RunEnvelope::Field(text));
                    }
                }
                Some(Value::Array(items)) => {
                    let fragments: Vec<String> = items.iter().filter_map(fragment_text).collect();
                    if !fragments.is_empty() {
                        return Some(RunEnvelope::Fragments(fragments));
                    }
                }
                Some(inner @ Value::Object(_)) => {
                    if let Some(nested) = Self::probe(inner) {
                        return Some(RunEnvelope::Nested(Box::new(nested)));
                    }
                }
                _ => {}
            }
        }

        if let Some(Value::Array(payloads)) = map.get("result").and_then(|r| r.get("payloads")) {
            let texts: Vec<String> = payloads
                .iter()
                .filter_map(|p| p.get("text").and_then(non_empty_str))
                .collect();
            if !texts.is_empty() {
                return Some(RunEnvelope::Payloads(texts));
            }
        }

        None
    }

    /// Display text, possibly empty. Never has surrounding whitespace.
    pub fn text(&self) -> String {
        match self {
            RunEnvelope::Text(s) | RunEnvelope::Field(s) => s.clone(),
            RunEnvelope::Fragments(fragments) => fragments.join("\n"),
            RunEnvelope::Nested(inner) => inner.text(),
            RunEnvelope::Payloads(texts) => texts.join("\n\n"),
            RunEnvelope::Opaque(value) => render_opaque(value),
        }
    }
}

/// Best-effort text for `payload`, possibly empty.
pub fn extract_text(payload: &Value) -> String {
    RunEnvelope::parse(payload).text()
}

/// Text for `payload`, or [`NO_TEXT_PLACEHOLDER`] if there is none.
pub fn extract_reply(payload: &Value) -> String {
    let text = extract_text(payload);
    if text.is_empty() {
        NO_TEXT_PLACEHOLDER.to_string()
    } else {
        text
    }
}

fn fragment_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => non_empty(s),
        Value::Object(map) => FRAGMENT_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(non_empty_str)),
        _ => None,
    }
}

fn render_opaque(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) if map.is_empty() => String::new(),
        Value::Array(items) if items.is_empty() => String::new(),
        other => other.to_string(),
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().and_then(non_empty)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string() {
        assert_eq!(extract_reply(&json!("hello")), "hello");
        assert_eq!(extract_reply(&json!("  padded \n")), "padded");
    }

    #[test]
    fn test_text_fields() {
        assert_eq!(extract_reply(&json!({"text": "hi"})), "hi");
        assert_eq!(extract_reply(&json!({"message": " msg "})), "msg");
        assert_eq!(extract_reply(&json!({"outputText": "out"})), "out");
        assert_eq!(
            RunEnvelope::parse(&json!({"text": "hi"})),
            RunEnvelope::Field("hi".to_string())
        );
    }

    #[test]
    fn test_text_field_wins_over_summary() {
        let payload = json!({"text": "direct", "summary": [{"text": "fragment"}]});
        assert_eq!(extract_reply(&payload), "direct");
    }

    #[test]
    fn test_summary_fragments() {
        assert_eq!(
            extract_reply(&json!({"summary": [{"text": "a"}, {"text": "b"}]})),
            "a\nb"
        );
        assert_eq!(
            extract_reply(&json!({"output": ["x", {"summary_text": "y"}, {"other": 1}, ""]})),
            "x\ny"
        );
    }

    #[test]
    fn test_string_summary() {
        assert_eq!(extract_reply(&json!({"status": "ok", "summary": "done"})), "done");
    }

    #[test]
    fn test_nested_summary_object() {
        let payload = json!({"status": "ok", "summary": {"content": [{"text": "deep"}]}});
        assert_eq!(
            RunEnvelope::parse(&payload),
            RunEnvelope::Nested(Box::new(RunEnvelope::Fragments(vec!["deep".to_string()])))
        );
        assert_eq!(extract_reply(&payload), "deep");
    }

    #[test]
    fn test_result_payloads() {
        let payload = json!({
            "runId": "r1",
            "result": {"payloads": [{"text": "first"}, {"mediaUrl": "x"}, {"text": "second"}]}
        });
        assert_eq!(extract_reply(&payload), "first\n\nsecond");
    }

    #[test]
    fn test_empty_nested_summary_falls_through_to_payloads() {
        let payload = json!({
            "summary": {"unknown": true},
            "result": {"payloads": [{"text": "fallback"}]}
        });
        assert_eq!(extract_reply(&payload), "fallback");
    }

    #[test]
    fn test_opaque_fallback_serializes() {
        let payload = json!({"status": "ok", "runId": "r1"});
        assert!(matches!(RunEnvelope::parse(&payload), RunEnvelope::Opaque(_)));
        assert_eq!(extract_reply(&payload), payload.to_string());
        assert_eq!(extract_reply(&json!(42)), "42");
    }

    #[test]
    fn test_nothing_extractable_uses_placeholder() {
        assert_eq!(extract_reply(&json!({})), NO_TEXT_PLACEHOLDER);
        assert_eq!(extract_reply(&Value::Null), NO_TEXT_PLACEHOLDER);
        assert_eq!(extract_reply(&json!("")), NO_TEXT_PLACEHOLDER);
        assert_eq!(extract_reply(&json!({"summary": []})), "{\"summary\":[]}");
    }

    #[test]
    fn test_extraction_is_idempotent_on_its_output() {
        let inputs = [
            json!("hello"),
            json!({"text": " hi "}),
            json!({"summary": [{"text": "a"}, {"text": "b"}]}),
            json!({"result": {"payloads": [{"text": "p1"}, {"text": "p2"}]}}),
            json!({"runId": 1}),
            json!({}),
        ];
        for input in inputs {
            let once = extract_reply(&input);
            assert_eq!(extract_reply(&Value::String(once.clone())), once);
        }
    }
}
