//! Normalized tool-result shape and the pure coercion from host shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One typed content part of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text content.
    Text {
        /// Text payload.
        text: String,
    },
    /// Non-text content carried verbatim.
    Json {
        /// Raw part payload.
        value: Value,
    },
}

/// Normalized tool-call result shared by both adapter variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
    /// Structured payload, when the host supplied one.
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    /// Whether the host flagged the result as an error.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Builds a plain-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::Text { text: text.into() }],
            structured: None,
            is_error: false,
        }
    }

    /// Returns the first text-typed content part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            ContentPart::Json { .. } => None,
        })
    }
}

fn content_part_from(part: &Value) -> ContentPart {
    if let Some(text) = part
        .as_object()
        .filter(|map| map.get("type").and_then(Value::as_str) == Some("text"))
        .and_then(|map| map.get("text"))
        .and_then(Value::as_str)
    {
        return ContentPart::Text {
            text: text.to_string(),
        };
    }
    ContentPart::Json {
        value: part.clone(),
    }
}

/// Coerces the host-shape variants of a tool result into [`ToolResult`].
///
/// Precedence is fixed and auditable: an existing `content` array wins, then a
/// top-level `text` property, then JSON serialization of the whole value.
/// Objects without a `content` array carry `structuredContent` (or the whole
/// object) as the structured payload; already-normalized results carry only
/// their explicit `structuredContent`.
pub fn normalize_tool_result(raw: &Value) -> ToolResult {
    match raw {
        Value::String(text) => ToolResult::text(text.clone()),
        Value::Object(map) => {
            let is_error = map.get("isError").and_then(Value::as_bool).unwrap_or(false);
            let explicit_structured = map.get("structuredContent").cloned();
            if let Some(Value::Array(parts)) = map.get("content") {
                ToolResult {
                    content: parts.iter().map(content_part_from).collect(),
                    structured: explicit_structured,
                    is_error,
                }
            } else if let Some(text) = map.get("text").and_then(Value::as_str) {
                ToolResult {
                    content: vec![ContentPart::Text {
                        text: text.to_string(),
                    }],
                    structured: explicit_structured.or_else(|| Some(raw.clone())),
                    is_error,
                }
            } else {
                ToolResult {
                    content: vec![ContentPart::Text {
                        text: raw.to_string(),
                    }],
                    structured: explicit_structured.or_else(|| Some(raw.clone())),
                    is_error,
                }
            }
        }
        other => ToolResult::text(other.to_string()),
    }
}

/// Shallow-merges a widget-state patch over the current state.
///
/// Object patches merge key-by-key over an object base; any other combination
/// replaces the base with the patch.
pub fn merge_widget_state(base: Option<&Value>, patch: &Value) -> Value {
    match (base, patch) {
        (Some(Value::Object(base)), Value::Object(patch)) => {
            let mut merged = base.clone();
            for (key, value) in patch {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_input_becomes_a_text_part() {
        let result = normalize_tool_result(&json!("42"));
        assert_eq!(result.first_text(), Some("42"));
        assert_eq!(result.structured, None);
        assert!(!result.is_error);
    }

    #[test]
    fn content_array_and_text_property_agree_on_first_text() {
        let from_text = normalize_tool_result(&json!({"text": "42"}));
        let from_parts =
            normalize_tool_result(&json!({"content": [{"type": "text", "text": "42"}]}));
        assert_eq!(from_text.first_text(), Some("42"));
        assert_eq!(from_parts.first_text(), Some("42"));
    }

    #[test]
    fn content_array_wins_over_text_property() {
        let result = normalize_tool_result(&json!({
            "content": [{"type": "text", "text": "from-content"}],
            "text": "from-text",
        }));
        assert_eq!(result.first_text(), Some("from-content"));
    }

    #[test]
    fn bare_object_serializes_and_carries_itself_as_structured() {
        let raw = json!({"status": true, "value": 42});
        let result = normalize_tool_result(&raw);
        let text = result.first_text().expect("serialized text part");
        assert_eq!(
            serde_json::from_str::<Value>(text).expect("valid json"),
            raw
        );
        assert_eq!(result.structured, Some(raw));
    }

    #[test]
    fn explicit_structured_content_wins() {
        let result = normalize_tool_result(&json!({
            "content": [],
            "structuredContent": {"n": 1},
            "isError": true,
        }));
        assert_eq!(result.structured, Some(json!({"n": 1})));
        assert!(result.is_error);
    }

    #[test]
    fn unknown_part_kinds_are_carried_verbatim() {
        let result = normalize_tool_result(&json!({
            "content": [{"type": "image", "data": "…"}],
        }));
        assert_eq!(
            result.content,
            vec![ContentPart::Json {
                value: json!({"type": "image", "data": "…"}),
            }]
        );
    }

    #[test]
    fn scalar_fallback_stringifies() {
        assert_eq!(normalize_tool_result(&json!(7)).first_text(), Some("7"));
    }

    #[test]
    fn merge_widget_state_is_a_shallow_merge() {
        let base = json!({"a": 1, "b": 2});
        let merged = merge_widget_state(Some(&base), &json!({"k": "v"}));
        assert_eq!(merged, json!({"a": 1, "b": 2, "k": "v"}));
    }

    #[test]
    fn merge_widget_state_replaces_non_object_base() {
        assert_eq!(
            merge_widget_state(None, &json!({"k": "v"})),
            json!({"k": "v"})
        );
        assert_eq!(merge_widget_state(Some(&json!(3)), &json!([1])), json!([1]));
    }
}
