//! `str_replace_editor` tool (§4.6/§10), ported from
//! `executors.py::str_replace_editor`.
//!
//! `old_str` empty → prepend `new_str` to the file (creating it if absent).
//! `old_str` present → replace every occurrence with `new_str`. `old_str`
//! absent from the file → report the longest prefix of `old_str` that *was*
//! found, with surrounding context, rather than a bare "not found".

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::{Tool, ToolResult};

const PROTECTED_PREFIXES: &[&str] = &["/etc", "/usr", "/var", "/sys", "/boot", "/dev"];

/// Refuses edits rooted under well-known system directories.
pub(crate) fn is_protected_path(path: &Path) -> bool {
    let Ok(canon) = std::fs::canonicalize(path).or_else(|_| {
        path.parent()
            .map(std::fs::canonicalize)
            .unwrap_or_else(|| Ok(PathBuf::new()))
    }) else {
        return false;
    };
    let s = canon.to_string_lossy();
    PROTECTED_PREFIXES.iter().any(|p| s.starts_with(p))
}

const CONTEXT_RADIUS: usize = 40;

/// Finds the longest prefix of `needle` present anywhere in `haystack`,
/// returning the prefix and a context window around its match.
fn longest_matching_prefix<'a>(haystack: &'a str, needle: &str) -> Option<(String, String)> {
    for len in (1..=needle.len()).rev() {
        // Keep the candidate on a char boundary.
        if !needle.is_char_boundary(len) {
            continue;
        }
        let candidate = &needle[..len];
        if let Some(pos) = haystack.find(candidate) {
            let start = haystack[..pos].char_indices().rev().nth(CONTEXT_RADIUS).map(|(i, _)| i).unwrap_or(0);
            let end_idx = pos + candidate.len();
            let end = haystack[end_idx..]
                .char_indices()
                .nth(CONTEXT_RADIUS)
                .map(|(i, _)| end_idx + i)
                .unwrap_or(haystack.len());
            return Some((candidate.to_string(), haystack[start..end].to_string()));
        }
    }
    None
}

pub struct StrReplaceEditorTool {
    project_root: PathBuf,
}

impl StrReplaceEditorTool {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        let p = Path::new(file_path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }
}

#[derive(Deserialize)]
struct EditorInput {
    file_path: String,
    #[serde(default)]
    old_str: String,
    #[serde(default)]
    new_str: String,
}

#[async_trait::async_trait]
impl Tool for StrReplaceEditorTool {
    fn name(&self) -> &str {
        "str_replace_editor"
    }

    fn description(&self) -> &str {
        "Replace an exact string occurrence in a file, or prepend if old_str is empty."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string"},
                "old_str": {"type": "string", "description": "Exact text to replace; empty to prepend"},
                "new_str": {"type": "string"}
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: EditorInput = serde_json::from_value(input)?;
        let path = self.resolve(&input.file_path);

        if is_protected_path(&path) {
            return Ok(ToolResult::error(format!(
                "Refusing to edit {}: path is under a protected system directory.",
                input.file_path
            )));
        }

        let existing = std::fs::read_to_string(&path).unwrap_or_default();
        let file_exists = path.exists();

        if input.old_str.is_empty() {
            let new_content = format!("{}{}", input.new_str, existing);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::write(&path, new_content)?;
            return Ok(ToolResult::success(format!("Prepended to {}.", input.file_path)));
        }

        if !file_exists {
            return Ok(ToolResult::error(format!("{} does not exist.", input.file_path)));
        }

        if !existing.contains(&input.old_str) {
            return Ok(ToolResult::error(match longest_matching_prefix(&existing, &input.old_str) {
                Some((prefix, context)) => format!(
                    "old_str not found in {}. Longest matching prefix was {:?}, near: {:?}",
                    input.file_path, prefix, context
                ),
                None => format!("old_str not found in {}, and no matching prefix was found.", input.file_path),
            }));
        }

        let replaced = existing.matches(input.old_str.as_str()).count();
        let new_content = existing.replace(&input.old_str, &input.new_str);
        std::fs::write(&path, new_content)?;
        Ok(ToolResult::success(format!(
            "Replaced {replaced} occurrence(s) in {}.",
            input.file_path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("editor-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn prepends_when_old_str_empty() {
        let root = tempdir();
        let path = root.join("notes.txt");
        fs::write(&path, "body").unwrap();
        let tool = StrReplaceEditorTool::new(root);
        let result = tool
            .execute(json!({"file_path": "notes.txt", "old_str": "", "new_str": "head\n"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fs::read_to_string(path).unwrap(), "head\nbody");
    }

    #[tokio::test]
    async fn replaces_every_occurrence() {
        let root = tempdir();
        let path = root.join("dup.txt");
        fs::write(&path, "a b a").unwrap();
        let tool = StrReplaceEditorTool::new(root);
        let result = tool
            .execute(json!({"file_path": "dup.txt", "old_str": "a", "new_str": "x"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fs::read_to_string(path).unwrap(), "x b x");
    }

    #[tokio::test]
    async fn reports_longest_matching_prefix_on_miss() {
        let root = tempdir();
        let path = root.join("miss.txt");
        fs::write(&path, "hello world").unwrap();
        let tool = StrReplaceEditorTool::new(root);
        let result = tool
            .execute(json!({"file_path": "miss.txt", "old_str": "hello wonderful", "new_str": "x"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("hello "));
    }

    #[test]
    fn protects_etc() {
        assert!(is_protected_path(Path::new("/etc/passwd")));
    }
}
