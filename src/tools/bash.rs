//! `bash` tool: shell script execution (§4.6/§10).
//!
//! Framing is ported from `executors.py::run_bash_script`: each stream is
//! only labeled when it actually produced output, and a command that
//! produced nothing at all gets a fixed fallback line.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use super::{Tool, ToolResult};
use crate::constants::BASH_TIMEOUT_SECS;

pub struct BashTool {
    project_root: PathBuf,
}

impl BashTool {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }
}

#[derive(Deserialize)]
struct BashInput {
    script: String,
}

/// Renders a completed process's stdout/stderr in the fixed framing. Only
/// a stream that actually produced output gets its own `--- STDOUT/STDERR
/// ---` section (matching `executors.py`'s `if result.stdout: ...`/`if
/// result.stderr: ...` guards); a command that produced nothing on either
/// stream gets the fixed fallback line instead.
pub(crate) fn format_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim_end_matches('\n');
    let stderr = stderr.trim_end_matches('\n');

    let mut sections = Vec::new();
    if !stdout.is_empty() {
        sections.push(format!("--- STDOUT ---\n{stdout}"));
    }
    if !stderr.is_empty() {
        sections.push(format!("--- STDERR ---\n{stderr}"));
    }

    if sections.is_empty() {
        return "Script executed successfully but produced no output.".to_string();
    }

    sections.join("\n\n")
}

pub(crate) fn timeout_message(secs: u64) -> String {
    format!("Script timed out after {secs} seconds.")
}

#[async_trait::async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a bash script in the project directory and return its stdout/stderr."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": {
                    "type": "string",
                    "description": "Shell script to execute"
                }
            },
            "required": ["script"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: BashInput = serde_json::from_value(input)?;

        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(&input.script);
        cmd.current_dir(&self.project_root);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => return Ok(ToolResult::error(format!("Failed to start script: {e}"))),
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

    #[test]
    fn formats_both_streams() {
        let out = format_output("a\n", "b\n");
        assert_eq!(out, "--- STDOUT ---\na\n\n--- STDERR ---\nb");
    }

    #[test]
    fn omits_stderr_section_when_stderr_is_empty() {
        assert_eq!(format_output("1\n", ""), "--- STDOUT ---\n1");
    }

    #[test]
    fn omits_stdout_section_when_stdout_is_empty() {
        assert_eq!(format_output("", "oops\n"), "--- STDERR ---\noops");
    }

    #[test]
    fn empty_streams_fall_back() {
        assert_eq!(format_output("", ""), "Script executed successfully but produced no output.");
    }

    #[tokio::test]
    async fn runs_and_captures_stdout() {
        let tool = BashTool::new(std::env::temp_dir());
        let result = tool.execute(json!({"script": "echo hi"})).await.unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("hi"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_itself_an_error() {
        // executors.py doesn't special-case exit codes: stderr is enough signal.
        let tool = BashTool::new(std::env::temp_dir());
        let result = tool.execute(json!({"script": "echo oops >&2; exit 1"})).await.unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("oops"));
    }
}
