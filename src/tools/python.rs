//! `python` tool (§4.6/§10): runs a script via a `python3` subprocess.
//!
//! `executors.py::run_python_script` executes the script in-process with
//! `exec`, sharing the caller's interpreter state across calls. There is no
//! safe Rust analogue to an embedded, stateful Python interpreter, so this
//! shells out to a fresh `python3` process per call instead — a documented
//! deviation (DESIGN.md). Output framing matches `bash` exactly.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use super::bash::{format_output, timeout_message};
use super::{Tool, ToolResult};
use crate::constants::BASH_TIMEOUT_SECS;

pub struct PythonTool {
    project_root: PathBuf,
}

impl PythonTool {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }
}

#[derive(Deserialize)]
struct PythonInput {
    script: String,
}

#[async_trait::async_trait]
impl Tool for PythonTool {
    fn name(&self) -> &str {
        "python"
    }

    fn description(&self) -> &str {
        "Execute a Python script in the project directory and return its stdout/stderr."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": {
                    "type": "string",
                    "description": "Python script to execute"
                }
            },
            "required": ["script"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: PythonInput = serde_json::from_value(input)?;

        let mut cmd = tokio::process::Command::new("python3");
        cmd.arg("-c").arg(&input.script);
        cmd.current_dir(&self.project_root);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => return Ok(ToolResult::error(format!("Failed to start python3: {e}"))),
        };

        match tokio::time::timeout(Duration::from_secs(BASH_TIMEOUT_SECS), child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                Ok(ToolResult::success(format_output(&stdout, &stderr)))
            }
            Ok(Err(e)) => Ok(ToolResult::error(format!("Failed to run script: {e}"))),
            Err(_) => Ok(ToolResult::error(timeout_message(BASH_TIMEOUT_SECS))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_and_captures_stdout() {
        let tool = PythonTool::new(std::env::temp_dir());
        let result = tool.execute(json!({"script": "print('hi')"})).await.unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("hi"));
    }
}
