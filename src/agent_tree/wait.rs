//! Wait coordinator (§4.10): poll the filesystem for child `result.json`
//! files with all/any/timeout semantics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::constants::WAIT_POLL_INTERVAL_SECS;

use super::launcher::PaneRef;
use super::tree::{self, ChildResult};

#[derive(Debug, Clone, Serialize)]
pub struct WaitOutcome {
    pub completed: Vec<String>,
    pub results: HashMap<String, Value>,
    pub pending: Vec<String>,
}

/// Scans every parent directory under `tree_id` and maps each known child
/// id to its directory, re-run on every poll cycle to pick up late-spawned
/// siblings (§4.10).
fn scan_all_children(project_root: &Path, tree_id: &str) -> HashMap<String, PathBuf> {
    let mut map = HashMap::new();
    let dir = project_root.join(crate::constants::STATE_DIR).join(crate::constants::AGENTS_DIR).join(tree_id);
    let Ok(parents) = std::fs::read_dir(&dir) else {
        return map;
    };
    for parent in parents.flatten() {
        if !parent.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let parent_id = parent.file_name().to_string_lossy().to_string();
        for child_id in tree::list_children(project_root, tree_id, &parent_id).unwrap_or_default() {
            let dir = tree::child_dir(project_root, tree_id, &parent_id, &child_id);
            map.insert(child_id, dir);
        }
    }
    map
}

/// `wait_agents({which, timeout_sec, any_mode})`.
///
/// `which=[]` means "all currently-known children across this tree" — the
/// id set is fixed at the start of the call from the first scan; ids
/// spawned after that point are not waited on (matching "scan" as a
/// snapshot, not a moving target, for the all-mode case).
pub async fn wait_agents(
    project_root: &Path,
    tree_id: &str,
    which: Vec<String>,
    timeout_sec: Option<f64>,
    any_mode: bool,
) -> Result<WaitOutcome> {
    let mut dir_map = scan_all_children(project_root, tree_id);

    let mut pending: Vec<String> = if which.is_empty() {
        dir_map.keys().cloned().collect()
    } else {
        which
    };
    pending.sort();

    let mut completed = Vec::new();
    let mut results = HashMap::new();
    let deadline = timeout_sec.map(|secs| std::time::Instant::now() + Duration::from_secs_f64(secs.max(0.0)));

    loop {
        dir_map = scan_all_children(project_root, tree_id);

        let mut still_pending = Vec::new();
        for id in &pending {
            let Some(dir) = dir_map.get(id) else {
                still_pending.push(id.clone());
                continue;
            };
            match tree::read_result(dir) {
                Some(result) => {
                    completed.push(id.clone());
                    kill_child_pane(dir, &result);
                    results.insert(id.clone(), serde_json::to_value(&result)?);
                    if any_mode {
                        still_pending.extend(pending.iter().filter(|p| *p != id).cloned());
                        return Ok(WaitOutcome { completed, results, pending: still_pending });
                    }
                }
                None => still_pending.push(id.clone()),
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            break;
        }
        if let Some(deadline) = deadline {
            if std::time::Instant::now() >= deadline {
                break;
            }
        }

        tokio::time::sleep(Duration::from_secs(WAIT_POLL_INTERVAL_SECS)).await;
    }

    Ok(WaitOutcome { completed, results, pending })
}

fn kill_child_pane(child_dir: &Path, _result: &ChildResult) {
    if let Ok(state) = tree::read_state(child_dir) {
        if let Some(pane_id) = state.pane_id {
            let pane = PaneRef::new(pane_id);
            tokio::spawn(async move { pane.kill().await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_tree::tree::{write_result, ChildResult};
    use serde_json::json;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wait-test-{}-{}", std::process::id(), line!()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn waits_for_all_known_children() {
        let root = tempdir();
        let a = tree::child_dir(&root, "T", "root", "worker-001");
        let b = tree::child_dir(&root, "T", "root", "worker-002");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        write_result(&a, &ChildResult { status: "done".into(), return_value: json!("r1"), short_recap: None, finished_at: "t".into() }).unwrap();
        write_result(&b, &ChildResult { status: "done".into(), return_value: json!("r2"), short_recap: None, finished_at: "t".into() }).unwrap();

        let outcome = wait_agents(&root, "T", vec![], None, false).await.unwrap();
        assert_eq!(outcome.pending.len(), 0);
        assert_eq!(outcome.completed.len(), 2);
        assert!(outcome.results.contains_key("worker-001"));
        assert!(outcome.results.contains_key("worker-002"));
    }

    #[tokio::test]
    async fn any_mode_returns_on_first_completion() {
        let root = tempdir();
        let a = tree::child_dir(&root, "T", "root", "a-001");
        let b = tree::child_dir(&root, "T", "root", "b-001");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        write_result(&a, &ChildResult { status: "done".into(), return_value: json!("r1"), short_recap: None, finished_at: "t".into() }).unwrap();

        let outcome = wait_agents(&root, "T", vec!["a-001".into(), "b-001".into()], None, true).await.unwrap();
        assert_eq!(outcome.completed, vec!["a-001".to_string()]);
        assert_eq!(outcome.pending, vec!["b-001".to_string()]);
    }

    #[tokio::test]
    async fn timeout_returns_partial_progress() {
        let root = tempdir();
        let a = tree::child_dir(&root, "T", "root", "slow-001");
        std::fs::create_dir_all(&a).unwrap();

        let outcome = wait_agents(&root, "T", vec!["slow-001".into()], Some(0.05), false).await.unwrap();
        assert_eq!(outcome.pending, vec!["slow-001".to_string()]);
        assert!(outcome.completed.is_empty());
    }
}
