//! Agent tree directory layout, child id allocation, and state/result file
//! I/O (§4.8).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{AGENTS_DIR, CURRENT_TREE_FILE, ENV_AGENT_ID, ENV_TREE_ID, ROOT_ID, STATE_DIR};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildState {
    pub agent_id: String,
    pub parent_id: String,
    pub status: String,
    #[serde(default)]
    pub model_key: Option<String>,
    pub spawned_at: String,
    pub cwd: String,
    #[serde(default)]
    pub pane_id: Option<String>,
    #[serde(default)]
    pub right_column_pane_id: Option<String>,
    #[serde(default)]
    pub auto_tool_approve: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildResult {
    pub status: String,
    pub return_value: Value,
    #[serde(default)]
    pub short_recap: Option<String>,
    pub finished_at: String,
}

fn agents_root(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join(AGENTS_DIR)
}

pub fn tree_dir(project_root: &Path, tree_id: &str) -> PathBuf {
    agents_root(project_root).join(tree_id)
}

pub fn parent_dir(project_root: &Path, tree_id: &str, parent_id: &str) -> PathBuf {
    tree_dir(project_root, tree_id).join(parent_id)
}

pub fn children_dir(project_root: &Path, tree_id: &str, parent_id: &str) -> PathBuf {
    parent_dir(project_root, tree_id, parent_id).join("children")
}

pub fn child_dir(project_root: &Path, tree_id: &str, parent_id: &str, child_id: &str) -> PathBuf {
    children_dir(project_root, tree_id, parent_id).join(child_id)
}

fn label_re(label: &str) -> Regex {
    Regex::new(&format!("^{}-(\\d+)$", regex::escape(label))).unwrap()
}

fn sanitize_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[ /\\]"#).unwrap())
}

/// Sanitizes a requested label by replacing any of `" /\\"` with `_`, then
/// allocates `<label>-NNN`, one past the max existing numeric suffix among
/// siblings (§4.8).
pub fn allocate_child_id(project_root: &Path, tree_id: &str, parent_id: &str, label: &str) -> Result<String> {
    let sanitized = sanitize_label_re().replace_all(label, "_").to_string();
    let dir = children_dir(project_root, tree_id, parent_id);

    let mut max_suffix = 0u32;
    if dir.is_dir() {
        let pattern = label_re(&sanitized);
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(caps) = pattern.captures(&name) {
                if let Ok(n) = caps[1].parse::<u32>() {
                    max_suffix = max_suffix.max(n);
                }
            }
        }
    }

    Ok(format!("{sanitized}-{:03}", max_suffix + 1))
}

/// Tree id resolution (§4.8): `EG_TREE_ID` env → `.current_tree` sentinel →
/// a freshly allocated id (current unix seconds), persisted to the
/// sentinel for subsequent spawns in the same tree.
pub fn resolve_tree_id(project_root: &Path, now_unix_secs: u64) -> Result<String> {
    if let Ok(id) = std::env::var(ENV_TREE_ID) {
        if !id.is_empty() {
            return Ok(id);
        }
    }

    let sentinel = agents_root(project_root).join(CURRENT_TREE_FILE);
    if let Ok(existing) = std::fs::read_to_string(&sentinel) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let id = now_unix_secs.to_string();
    if let Some(parent) = sentinel.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&sentinel, &id)?;
    Ok(id)
}

/// Parent id resolution (§4.8): `EG_AGENT_ID` env → `root`.
pub fn resolve_parent_id() -> String {
    std::env::var(ENV_AGENT_ID).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| ROOT_ID.to_string())
}

pub fn write_state(dir: &Path, state: &ChildState) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(dir.join("state.json"), json)?;
    Ok(())
}

pub fn read_state(dir: &Path) -> Result<ChildState> {
    let text = std::fs::read_to_string(dir.join("state.json")).with_context(|| format!("reading {}/state.json", dir.display()))?;
    Ok(serde_json::from_str(&text)?)
}

/// Atomic write-then-rename, per §9's "filesystem as IPC" note.
pub fn write_result(dir: &Path, result: &ChildResult) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(result)?;
    let tmp = dir.join("result.json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, dir.join("result.json"))?;
    Ok(())
}

/// Returns `None` if `result.json` doesn't exist yet; readers must
/// tolerate this (§3 invariants).
pub fn read_result(dir: &Path) -> Option<ChildResult> {
    let text = std::fs::read_to_string(dir.join("result.json")).ok()?;
    serde_json::from_str(&text).ok()
}

pub fn touch_notify_done(dir: &Path) -> Result<()> {
    let notify_dir = dir.join("notify");
    std::fs::create_dir_all(&notify_dir)?;
    std::fs::write(notify_dir.join("done"), "")?;
    Ok(())
}

/// Lists direct child directory names under `parent_id` (`list_agents`).
pub fn list_children(project_root: &Path, tree_id: &str, parent_id: &str) -> Result<Vec<String>> {
    let dir = children_dir(project_root, tree_id, parent_id);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("agent-tree-test-{}-{}", std::process::id(), line!()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn allocates_first_child_as_001() {
        let root = tempdir();
        let id = allocate_child_id(&root, "T", "root", "worker").unwrap();
        assert_eq!(id, "worker-001");
    }

    #[test]
    fn allocates_beyond_max_existing_suffix() {
        let root = tempdir();
        let dir = children_dir(&root, "T", "root");
        std::fs::create_dir_all(dir.join("worker-001")).unwrap();
        std::fs::create_dir_all(dir.join("worker-007")).unwrap();
        let id = allocate_child_id(&root, "T", "root", "worker").unwrap();
        assert_eq!(id, "worker-008");
    }

    #[test]
    fn sanitizes_label_before_allocating() {
        let root = tempdir();
        let id = allocate_child_id(&root, "T", "root", "my label/ugh").unwrap();
        assert_eq!(id, "my_label_ugh-001");
    }

    #[test]
    fn result_round_trips_through_atomic_write() {
        let root = tempdir();
        let dir = root.join("child");
        let result = ChildResult {
            status: "done".to_string(),
            return_value: Value::String("r1".to_string()),
            short_recap: None,
            finished_at: "2026-07-27T00:00:00Z".to_string(),
        };
        write_result(&dir, &result).unwrap();
        let read = read_result(&dir).unwrap();
        assert_eq!(read.return_value, Value::String("r1".to_string()));
        assert!(!dir.join("result.json.tmp").exists());
    }

    #[test]
    fn read_result_tolerates_absence() {
        let root = tempdir();
        assert!(read_result(&root.join("nope")).is_none());
    }
}
