//! `replace_lines` tool (§4.6/§10), ported from
//! `executors.py::replace_lines`. All line numbers are 1-based and
//! inclusive.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::editor::is_protected_path;
use super::{Tool, ToolResult};

pub struct ReplaceLinesTool {
    project_root: PathBuf,
}

impl ReplaceLinesTool {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        let p = std::path::Path::new(file_path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }
}

#[derive(Deserialize)]
struct ReplaceLinesInput {
    file_path: String,
    start_line: usize,
    #[serde(default)]
    end_line: Option<usize>,
    #[serde(default)]
    new_content: Option<String>,
    /// "replace" | "insert" | "delete"; inferred from `new_content` when absent.
    #[serde(default)]
    action: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ReplaceLinesTool {
    fn name(&self) -> &str {
        "replace_lines"
    }

    fn description(&self) -> &str {
        "Replace, insert, or delete a 1-based inclusive line range in a file."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string"},
                "start_line": {"type": "integer", "description": "1-based line number"},
                "end_line": {"type": "integer", "description": "1-based inclusive end; defaults to start_line"},
                "new_content": {"type": "string", "description": "Replacement text; omit to delete"},
                "action": {"type": "string", "description": "\"replace\", \"insert\", or \"delete\""}
            },
            "required": ["file_path", "start_line"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: ReplaceLinesInput = serde_json::from_value(input)?;
        let path = self.resolve(&input.file_path);

        if is_protected_path(&path) {
            return Ok(ToolResult::error(format!(
                "Refusing to edit {}: path is under a protected system directory.",
                input.file_path
            )));
        }

        let file_exists = path.exists();
        let existing = std::fs::read_to_string(&path).unwrap_or_default();
        let mut lines: Vec<String> = if existing.is_empty() {
            Vec::new()
        } else {
            existing.split('\n').map(str::to_string).collect()
        };

        let action = input.action.clone().unwrap_or_else(|| {
            if input.new_content.is_some() { "replace".to_string() } else { "delete".to_string() }
        });

        if !file_exists && action != "insert" {
            return Ok(ToolResult::error(format!("{} does not exist.", input.file_path)));
        }

        if !file_exists && input.start_line != 1 {
            return Ok(ToolResult::error(format!(
                "{} does not exist; insert is only supported at line 1 for new files.",
                input.file_path
            )));
        }

        let end_line = input.end_line.unwrap_or(input.start_line);

        let result = match action.as_str() {
            "insert" => {
                if input.start_line == 0 || input.start_line > lines.len() + 1 {
                    return Ok(ToolResult::error(format!(
                        "start_line {} out of range (file has {} lines).",
                        input.start_line,
                        lines.len()
                    )));
                }
                let new_lines: Vec<String> = input.new_content.unwrap_or_default().split('\n').map(str::to_string).collect();
                lines.splice(input.start_line - 1..input.start_line - 1, new_lines);
                format!("Inserted at line {} in {}.", input.start_line, input.file_path)
            }
            "delete" => {
                if input.start_line == 0 || end_line < input.start_line || end_line > lines.len() {
                    return Ok(ToolResult::error(format!(
                        "line range {}-{} out of range (file has {} lines).",
                        input.start_line,
                        end_line,
                        lines.len()
                    )));
                }
                lines.splice(input.start_line - 1..end_line, std::iter::empty());
                format!("Deleted lines {}-{} in {}.", input.start_line, end_line, input.file_path)
            }
            _ => {
                if input.start_line == 0 || end_line < input.start_line || end_line > lines.len() {
                    return Ok(ToolResult::error(format!(
                        "line range {}-{} out of range (file has {} lines).",
                        input.start_line,
                        end_line,
                        lines.len()
                    )));
                }
                let new_lines: Vec<String> = input.new_content.unwrap_or_default().split('\n').map(str::to_string).collect();
                lines.splice(input.start_line - 1..end_line, new_lines);
                format!("Replaced lines {}-{} in {}.", input.start_line, end_line, input.file_path)
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(&path, lines.join("\n"))?;
        Ok(ToolResult::success(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("replace-lines-test-{}-{}", std::process::id(), line!()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn replaces_a_single_line() {
        let root = tempdir();
        fs::write(root.join("f.txt"), "one\ntwo\nthree").unwrap();
        let tool = ReplaceLinesTool::new(root.clone());
        let result = tool
            .execute(json!({"file_path": "f.txt", "start_line": 2, "new_content": "TWO"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fs::read_to_string(root.join("f.txt")).unwrap(), "one\nTWO\nthree");
    }

    #[tokio::test]
    async fn deletes_a_range() {
        let root = tempdir();
        fs::write(root.join("f.txt"), "one\ntwo\nthree").unwrap();
        let tool = ReplaceLinesTool::new(root.clone());
        let result = tool
            .execute(json!({"file_path": "f.txt", "start_line": 1, "end_line": 2, "action": "delete"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fs::read_to_string(root.join("f.txt")).unwrap(), "three");
    }

    #[tokio::test]
    async fn inserts_into_missing_file_at_line_one() {
        let root = tempdir();
        let tool = ReplaceLinesTool::new(root.clone());
        let result = tool
            .execute(json!({"file_path": "new.txt", "start_line": 1, "new_content": "hello", "action": "insert"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fs::read_to_string(root.join("new.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn insert_into_missing_file_at_other_line_errors() {
        let root = tempdir();
        let tool = ReplaceLinesTool::new(root.clone());
        let result = tool
            .execute(json!({"file_path": "new.txt", "start_line": 2, "new_content": "hello", "action": "insert"}))
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
