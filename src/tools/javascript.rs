//! `javascript` tool (§4.6/§10).
//!
//! The original `run_javascript` drives an already-running Chrome instance
//! over the remote-debugging protocol — browser automation is out of scope
//! here (§1). This reports the same `{"error": ...}` shape the original
//! returns when Selenium/webdriver-manager are unavailable, rather than a
//! reimplementation of browser automation.

use anyhow::Result;
use serde_json::{json, Value};

use super::{Tool, ToolResult};

pub struct JavascriptTool;

impl JavascriptTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavascriptTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for JavascriptTool {
    fn name(&self) -> &str {
        "javascript"
    }

    fn description(&self) -> &str {
        "Execute JavaScript in a running browser tab (unavailable in this build)."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": {
                    "type": "string",
                    "description": "JavaScript to evaluate"
                },
                "url": {
                    "type": "string",
                    "description": "URL the target tab must match"
                },
                "url_match_mode": {
                    "type": "string",
                    "description": "\"exact\" or \"prefix\""
                }
            },
            "required": ["script"]
        })
    }

    async fn execute(&self, _input: Value) -> Result<ToolResult> {
        Ok(ToolResult::error(
            json!({"error": "browser driver unavailable: no running Chrome instance to attach to"}).to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_reports_driver_unavailable() {
        let tool = JavascriptTool::new();
        let result = tool.execute(json!({"script": "1+1"})).await.unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("error"));
    }
}
