//! JSON tool schema sent to the provider as the request's `tools` field.
//!
//! `spawn_agents`, `list_agents`, and `write_result` are dispatcher-reachable
//! (an operator can still trigger them via `/spawn`, `/wait`, or a running
//! child) but are never offered to the model directly.

use serde_json::{json, Value};

fn function_def(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    })
}

/// Builds the fixed 9-entry `tools` array offered to the model.
pub fn llm_tool_schema() -> Value {
    Value::Array(vec![
        function_def(
            "bash",
            "Execute a bash script in the project directory and return its stdout/stderr.",
            json!({"type": "object", "properties": {"script": {"type": "string"}}, "required": ["script"]}),
        ),
        function_def(
            "python",
            "Execute a Python script and return its stdout/stderr.",
            json!({"type": "object", "properties": {"script": {"type": "string"}}, "required": ["script"]}),
        ),
        function_def(
            "javascript",
            "Evaluate JavaScript in a running browser tab.",
            json!({
                "type": "object",
                "properties": {
                    "script": {"type": "string"},
                    "url": {"type": "string"},
                    "url_match_mode": {"type": "string"}
                },
                "required": ["script"]
            }),
        ),
        function_def(
            "popContext",
            "Pop the current context frame, returning a value to the caller (or ending this agent, if it is a spawned child).",
            json!({"type": "object", "properties": {"return_value": {"type": "string"}}, "required": ["return_value"]}),
        ),
        function_def(
            "str_replace_editor",
            "Replace an exact string occurrence in a file, or prepend if old_str is empty.",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string"},
                    "old_str": {"type": "string"},
                    "new_str": {"type": "string"}
                },
                "required": ["file_path", "old_str", "new_str"]
            }),
        ),
        function_def(
            "replace_lines",
            "Replace, insert, or delete a 1-based inclusive line range in a file.",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string"},
                    "start_line": {"type": "integer"},
                    "end_line": {"type": "integer"},
                    "new_content": {"type": "string"},
                    "action": {"type": "string"}
                },
                "required": ["file_path", "start_line"]
            }),
        ),
        function_def(
            "spawn_agent",
            "Spawn one child agent with a label and initial context text.",
            json!({
                "type": "object",
                "properties": {
                    "label": {"type": "string"},
                    "context_text": {"type": "string"},
                    "tree_id": {"type": "string"},
                    "parent_id": {"type": "string"},
                    "model_key": {"type": "string"}
                },
                "required": ["label", "context_text"]
            }),
        ),
        function_def(
            "spawn_agent_auto",
            "Identical to spawn_agent, but the child runs with tool auto-approve on.",
            json!({
                "type": "object",
                "properties": {
                    "label": {"type": "string"},
                    "context_text": {"type": "string"},
                    "tree_id": {"type": "string"},
                    "parent_id": {"type": "string"},
                    "model_key": {"type": "string"}
                },
                "required": ["label", "context_text"]
            }),
        ),
        function_def(
            "wait_agents",
            "Wait for child agents to complete and collect their results.",
            json!({
                "type": "object",
                "properties": {
                    "which": {"type": "array", "items": {"type": "string"}},
                    "timeout_sec": {"type": "number"},
                    "any_mode": {"type": "boolean"}
                }
            }),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_nine_entries_and_excludes_internal_tools() {
        let schema = llm_tool_schema();
        let array = schema.as_array().unwrap();
        assert_eq!(array.len(), 9);
        let names: Vec<&str> = array
            .iter()
            .map(|f| f["function"]["name"].as_str().unwrap())
            .collect();
        assert!(!names.contains(&"list_agents"));
        assert!(!names.contains(&"write_result"));
        assert!(!names.contains(&"spawn_agents"));
    }
}
