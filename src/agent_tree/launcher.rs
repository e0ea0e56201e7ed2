//! Agent launcher (§4.9): multiplexer session/pane management and the
//! generated `run.sh` that re-execs this binary with a child's identity.
//!
//! tmux itself is an external collaborator, specified only by its CLI
//! interface (§1) — every operation here shells out to the `tmux` binary
//! and tolerates it being unavailable or a pane having already closed
//! (§7: "Missing pane on kill: Ignored").

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tokio::process::Command;

use crate::constants::{TMUX_QUERY_TIMEOUT_SECS, TMUX_SESSION_PREFIX};

use super::tree::ChildState;

/// A tracked pane id that re-verifies liveness before use, per §9's
/// "Pane tracking" design note — avoids acting on a dangling id.
#[derive(Debug, Clone)]
pub struct PaneRef {
    pub id: String,
}

impl PaneRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub async fn exists(&self) -> bool {
        let output = tokio::time::timeout(
            Duration::from_secs(TMUX_QUERY_TIMEOUT_SECS),
            Command::new("tmux").args(["list-panes", "-a", "-F", "#{pane_id}"]).output(),
        )
        .await;
        match output {
            Ok(Ok(out)) => String::from_utf8_lossy(&out.stdout).lines().any(|l| l == self.id),
            _ => false,
        }
    }

    /// Kills the pane if it still exists; a missing pane is not an error.
    pub async fn kill(&self) {
        if !self.exists().await {
            return;
        }
        let _ = Command::new("tmux").args(["kill-pane", "-t", &self.id]).output().await;
    }
}

pub fn session_name(tree_id: &str) -> String {
    format!("{TMUX_SESSION_PREFIX}{tree_id}")
}

/// Creates the tree's multiplexer session if it doesn't already exist.
pub async fn ensure_session(tree_id: &str) -> Result<()> {
    let name = session_name(tree_id);
    let has_session = Command::new("tmux").args(["has-session", "-t", &name]).output().await;
    let exists = matches!(has_session, Ok(out) if out.status.success());
    if !exists {
        Command::new("tmux").args(["new-session", "-d", "-s", &name]).output().await?;
    }
    Ok(())
}

/// The multiplexer's own idea of "the pane I'm attached to right now".
/// Used as a fallback when a parent has no recorded pane of its own
/// (it was never itself spawned by this launcher — e.g. the root agent).
async fn current_pane_id() -> Option<String> {
    let output = Command::new("tmux").args(["display-message", "-p", "#{pane_id}"]).output().await.ok()?;
    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if id.is_empty() { None } else { Some(id) }
}

/// Last-resort fallback: the first pane tmux lists for the session at all,
/// in case neither the parent's own pane nor "current pane" resolved
/// (e.g. a session that was just created detached).
async fn first_session_pane(session: &str) -> Option<String> {
    let output = Command::new("tmux").args(["list-panes", "-t", session, "-F", "#{pane_id}"]).output().await.ok()?;
    String::from_utf8_lossy(&output.stdout).lines().next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Resolves the pane to split from, per `_spawn_into_parent_layer`'s three
/// fallback tiers: the parent's recorded pane (right column first, then
/// its own), then tmux's current-pane, then the session's first pane.
async fn resolve_split_target(session: &str, parent_state: &ChildState) -> Option<String> {
    if let Some(pane) = parent_state.right_column_pane_id.clone().or_else(|| parent_state.pane_id.clone()) {
        return Some(pane);
    }
    if let Some(pane) = current_pane_id().await {
        return Some(pane);
    }
    first_session_pane(session).await
}

/// Splits a new pane for a child, per §4.9's layout policy:
/// - first child of a parent: split the parent's own pane horizontally,
///   creating a right column; the new pane id is recorded as the parent's
///   `right_column_pane_id`.
/// - subsequent children: split the right column vertically, stacking
///   top-to-bottom; `right_column_pane_id` is advanced to the newest pane
///   so the next sibling appends below it.
pub async fn split_for_child(tree_id: &str, parent_state: &mut ChildState) -> Result<PaneRef> {
    ensure_session(tree_id).await?;
    let session = session_name(tree_id);

    let direction = if parent_state.right_column_pane_id.is_some() { "-v" } else { "-h" };
    let Some(split_from) = resolve_split_target(&session, parent_state).await else {
        anyhow::bail!("could not resolve a pane to split from in session {session}");
    };

    let output = Command::new("tmux").args(["split-window", direction, "-P", "-F", "#{pane_id}", "-t", &split_from]).output().await?;
    let pane_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if pane_id.is_empty() {
        anyhow::bail!("tmux split-window produced no pane id (session {session})");
    }

    parent_state.right_column_pane_id = Some(pane_id.clone());
    Ok(PaneRef::new(pane_id))
}

/// Generates `run.sh`: exports the child's identity, then execs this
/// binary so the child is a full instance of the engine, differing only
/// in environment (§2).
pub fn render_run_script(
    exe_path: &str,
    tree_id: &str,
    parent_id: &str,
    agent_id: &str,
    agent_dir: &Path,
    init_context_file: &Path,
    child_model: Option<&str>,
    yes_tool_flag: bool,
) -> String {
    let mut script = String::from("#!/usr/bin/env bash\nset -euo pipefail\n");
    script.push_str(&format!("export EG_TREE_ID={tree_id:?}\n"));
    script.push_str(&format!("export EG_PARENT_ID={parent_id:?}\n"));
    script.push_str(&format!("export EG_AGENT_ID={agent_id:?}\n"));
    script.push_str(&format!("export EG_AGENT_DIR={:?}\n", agent_dir.display().to_string()));
    script.push_str(&format!("export EG_INIT_CONTEXT_FILE={:?}\n", init_context_file.display().to_string()));
    if let Some(model) = child_model {
        script.push_str(&format!("export EG_CHILD_MODEL={model:?}\n"));
        script.push_str(&format!("export DEFAULT_MODEL={model:?}\n"));
    }
    if yes_tool_flag {
        script.push_str("export EG_YES_TOOL_FLAG=1\n");
    }
    script.push_str(&format!("exec {exe_path:?}\n"));
    script
}

/// Writes `run.sh` and instructs the pane to run it.
pub async fn launch_child(pane: &PaneRef, child_dir: &Path, run_script: &str) -> Result<()> {
    let script_path = child_dir.join("run.sh");
    std::fs::write(&script_path, run_script)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&script_path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script_path, perms)?;
    }

    Command::new("tmux")
        .args(["send-keys", "-t", &pane.id, &format!("bash {:?}", script_path.display().to_string()), "Enter"])
        .output()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_name_has_fixed_prefix() {
        assert_eq!(session_name("123"), "egg-tree-123");
    }

    #[test]
    fn run_script_exports_identity_and_execs_binary() {
        let script = render_run_script(
            "/usr/local/bin/egg",
            "123",
            "root",
            "worker-001",
            Path::new("/proj/.egg/agents/123/root/children/worker-001"),
            Path::new("/proj/.egg/agents/123/root/children/worker-001/init_context.txt"),
            Some("sonnet"),
            true,
        );
        assert!(script.contains("export EG_TREE_ID="));
        assert!(script.contains("export EG_AGENT_ID=\"worker-001\""));
        assert!(script.contains("export EG_YES_TOOL_FLAG=1"));
        assert!(script.contains("exec \"/usr/local/bin/egg\""));
    }
}
