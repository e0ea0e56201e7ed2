//! Message sanitizer (§4.2): produces the outbound copy of the transcript,
//! never mutating the in-memory original.

use crate::message::Message;

/// Sanitize `transcript` for sending to the provider:
/// - drop messages with `local_tool == true`,
/// - strip `reasoning_content`, `model_key`, `local_tool`,
/// - normalize `content: null` + no `tool_calls` to `content: ""`,
/// - drop an empty `tool_calls` list on assistant messages.
///
/// Ordering is preserved.
pub fn sanitize(transcript: &[Message]) -> Vec<Message> {
    transcript
        .iter()
        .filter(|m| !m.local_tool)
        .map(|m| {
            let mut out = m.clone();
            out.reasoning_content = None;
            out.model_key = None;
            out.local_tool = false;

            if let Some(calls) = &out.tool_calls {
                if calls.is_empty() {
                    out.tool_calls = None;
                }
            }

            if out.content.is_none() && out.tool_calls.is_none() {
                out.content = Some(String::new());
            }

            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ToolCall, ToolCallFunction};

    #[test]
    fn drops_local_tool_messages() {
        let transcript = vec![
            Message::system("S"),
            Message::tool("bash", "call_1", "local output").local_tool(),
        ];
        let out = sanitize(&transcript);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn strips_internal_fields() {
        let mut msg = Message::assistant("hi").with_model_key("gpt-4o");
        msg.reasoning_content = Some("thinking...".into());
        let out = sanitize(&[msg]);
        assert!(out[0].reasoning_content.is_none());
        assert!(out[0].model_key.is_none());
        assert!(!out[0].local_tool);
    }

    #[test]
    fn normalizes_null_content_without_tool_calls() {
        let msg = Message {
            role: crate::message::Role::Assistant,
            content: None,
            ..Default::default()
        };
        let out = sanitize(&[msg]);
        assert_eq!(out[0].content.as_deref(), Some(""));
    }

    #[test]
    fn keeps_null_content_with_tool_calls() {
        let msg = Message::assistant_tool_calls(vec![ToolCall {
            id: "call_1".into(),
            kind: "function".into(),
            function: ToolCallFunction {
                name: "bash".into(),
                arguments: "{}".into(),
            },
        }]);
        let out = sanitize(&[msg]);
        assert!(out[0].content.is_none());
        assert!(out[0].tool_calls.is_some());
    }

    #[test]
    fn removes_empty_tool_calls_list() {
        let msg = Message {
            role: crate::message::Role::Assistant,
            content: Some("hi".into()),
            tool_calls: Some(Vec::new()),
            ..Default::default()
        };
        let out = sanitize(&[msg]);
        assert!(out[0].tool_calls.is_none());
    }

    #[test]
    fn preserves_ordering() {
        let transcript = vec![Message::system("S"), Message::user("a"), Message::user("b")];
        let out = sanitize(&transcript);
        assert_eq!(out[1].text(), "a");
        assert_eq!(out[2].text(), "b");
    }
}
