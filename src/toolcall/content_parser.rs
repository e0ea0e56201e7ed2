//! Content-fallback tool-call detection (§4.4).
//!
//! Invoked only when an assistant turn produced non-empty text and zero
//! structured tool calls. Accepts three envelope shapes; `arguments` is
//! kept verbatim if the model already wrote a string, otherwise
//! re-serialized from whatever object shape it used.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone)]
pub struct ContentParseResult {
    pub calls: Vec<ParsedToolCall>,
    /// True when the raw text was, after trimming, a single JSON
    /// object/array and nothing else — the caller should treat the
    /// message as tool-call-only rather than display the JSON as prose.
    pub should_redisplay: bool,
}

pub fn parse_tool_calls_from_content(text: &str) -> Option<ContentParseResult> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_whole_json_literal(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if let Some(calls) = extract_shape(&value) {
                return Some(ContentParseResult {
                    calls,
                    should_redisplay: true,
                });
            }
        }
    }

    let (start, end) = find_embedded_json_span(trimmed)?;
    let candidate = &trimmed[start..=end];
    let value = serde_json::from_str::<Value>(candidate).ok()?;
    let calls = extract_shape(&value)?;
    Some(ContentParseResult {
        calls,
        should_redisplay: false,
    })
}

fn is_whole_json_literal(trimmed: &str) -> bool {
    (trimmed.starts_with('{') && trimmed.ends_with('}')) || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

fn find_embedded_json_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find(['{', '['])?;
    let opener = text.as_bytes()[start] as char;
    let closer = if opener == '{' { '}' } else { ']' };
    let end = text.rfind(closer)?;
    if end <= start {
        return None;
    }
    Some((start, end))
}

fn extract_arguments(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn call_from_function_like(obj: &Value) -> Option<ParsedToolCall> {
    let function = obj.get("function").unwrap_or(obj);
    let name = function.get("name")?.as_str()?.to_string();
    let arguments = function.get("arguments").map(extract_arguments).unwrap_or_default();
    Some(ParsedToolCall { name, arguments })
}

fn extract_shape(value: &Value) -> Option<Vec<ParsedToolCall>> {
    if let Some(obj) = value.as_object() {
        if let Some(tool_calls) = obj.get("tool_calls").and_then(Value::as_array) {
            let calls: Vec<_> = tool_calls.iter().filter_map(call_from_function_like).collect();
            return (!calls.is_empty()).then_some(calls);
        }
        if obj.contains_key("name") {
            return call_from_function_like(value).map(|c| vec![c]);
        }
        return None;
    }

    if let Some(array) = value.as_array() {
        let calls: Vec<_> = array.iter().filter_map(call_from_function_like).collect();
        return (!calls.is_empty() && calls.len() == array.len()).then_some(calls);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tool_calls_envelope() {
        let text = json!({"tool_calls": [{"function": {"name": "bash", "arguments": "{\"script\":\"ls\"}"}}]}).to_string();
        let result = parse_tool_calls_from_content(&text).unwrap();
        assert!(result.should_redisplay);
        assert_eq!(result.calls[0].name, "bash");
        assert_eq!(result.calls[0].arguments, "{\"script\":\"ls\"}");
    }

    #[test]
    fn parses_bare_array_shape() {
        let text = json!([{"name": "bash", "arguments": "{}"}]).to_string();
        let result = parse_tool_calls_from_content(&text).unwrap();
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].name, "bash");
    }

    #[test]
    fn parses_bare_object_shape() {
        let text = json!({"name": "bash", "arguments": "{}"}).to_string();
        let result = parse_tool_calls_from_content(&text).unwrap();
        assert_eq!(result.calls[0].name, "bash");
    }

    #[test]
    fn re_serializes_object_arguments() {
        let text = json!({"name": "bash", "arguments": {"script": "ls"}}).to_string();
        let result = parse_tool_calls_from_content(&text).unwrap();
        let args: Value = serde_json::from_str(&result.calls[0].arguments).unwrap();
        assert_eq!(args["script"], "ls");
    }

    #[test]
    fn keeps_prose_visible_when_json_is_embedded() {
        let text = format!("Sure, running that now: {}", json!({"name": "bash", "arguments": "{}"}));
        let result = parse_tool_calls_from_content(&text).unwrap();
        assert!(!result.should_redisplay);
    }

    #[test]
    fn returns_none_for_plain_prose() {
        assert!(parse_tool_calls_from_content("just chatting, no tool call here").is_none());
    }

    #[test]
    fn round_trips_all_three_shapes() {
        let original = vec![ParsedToolCall {
            name: "bash".to_string(),
            arguments: "{\"script\":\"ls\"}".to_string(),
        }];

        let envelope = json!({"tool_calls": [{"function": {"name": "bash", "arguments": "{\"script\":\"ls\"}"}}]}).to_string();
        assert_eq!(parse_tool_calls_from_content(&envelope).unwrap().calls, original);

        let array = json!([{"name": "bash", "arguments": "{\"script\":\"ls\"}"}]).to_string();
        assert_eq!(parse_tool_calls_from_content(&array).unwrap().calls, original);

        let bare = json!({"name": "bash", "arguments": "{\"script\":\"ls\"}"}).to_string();
        assert_eq!(parse_tool_calls_from_content(&bare).unwrap().calls, original);
    }
}
