use super::*;
use serde_json::json;

#[tokio::test]
async fn registry_with_builtins_registers_five_tools() {
    let registry = ToolRegistry::with_builtins(std::env::temp_dir());
    assert!(registry.get("bash").is_some());
    assert!(registry.get("python").is_some());
    assert!(registry.get("javascript").is_some());
    assert!(registry.get("str_replace_editor").is_some());
    assert!(registry.get("replace_lines").is_some());
}

#[tokio::test]
async fn unknown_tool_reports_error_result_not_err() {
    let registry = ToolRegistry::with_builtins(std::env::temp_dir());
    let result = registry.execute("nonexistent_tool", json!({})).await.unwrap();
    assert!(result.is_error);
}

#[tokio::test]
async fn bash_runs_through_the_registry() {
    let registry = ToolRegistry::with_builtins(std::env::temp_dir());
    let result = registry.execute("bash", json!({"script": "echo through-registry"})).await.unwrap();
    assert!(!result.is_error);
    assert!(result.content.contains("through-registry"));
}

#[tokio::test]
async fn javascript_always_unavailable() {
    let registry = ToolRegistry::with_builtins(std::env::temp_dir());
    let result = registry.execute("javascript", json!({"script": "1+1"})).await.unwrap();
    assert!(result.is_error);
}
