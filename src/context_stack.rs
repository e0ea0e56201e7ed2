//! Context stack (§4.7): snapshot-and-swap of the running conversation,
//! and the child-exit path `popContext` takes when running as a spawned
//! agent.
//!
//! Turn-triggering (`push_context` ends with "one assistant turn") is left
//! to the caller: these functions only mutate `Engine` state and report
//! what happened, so the conversation loop owns the actual HTTP round
//! trip.

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::agent_tree::tree::{self, ChildResult};
use crate::constants::{SHORT_RECAP_CLOSE, SHORT_RECAP_OPEN};
use crate::engine::Engine;
use crate::message::{Message, Role};
use crate::transcript;

#[derive(Debug, PartialEq, Eq)]
pub enum PopOutcome {
    /// Popped a frame (or reset to the base system prompt); the REPL keeps
    /// running.
    Popped,
    /// Running as a spawned child: `result.json` was written and the
    /// process should now exit with this code.
    ChildExit { code: i32 },
}

/// Extracts the substring between `<short_recap>` and `</short_recap>` in
/// the latest assistant message, if present (§4.7).
pub fn short_recap(transcript: &[Message]) -> Option<String> {
    let latest_assistant = transcript.iter().rev().find(|m| m.role == Role::Assistant)?;
    let content = latest_assistant.content.as_deref()?;
    let start = content.find(SHORT_RECAP_OPEN)? + SHORT_RECAP_OPEN.len();
    let end = content[start..].find(SHORT_RECAP_CLOSE)? + start;
    Some(content[start..end].to_string())
}

/// Resolves a context file path: `global/...` resolves against the
/// packaged `global_commands` directory; anything else resolves relative
/// to the project root.
fn resolve_context_file(engine: &Engine, file_path: &str) -> Result<String> {
    let path = if let Some(rest) = file_path.strip_prefix("global/") {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| engine.project_root.clone());
        exe_dir.join(crate::constants::GLOBAL_COMMANDS_DIR).join(rest)
    } else {
        engine.project_root.join(file_path)
    };
    std::fs::read_to_string(&path).with_context(|| format!("reading context file {}", path.display()))
}

/// `push_context(file_path?, text?)` (§4.7). At least one of `file_path`/
/// `text` must be given.
pub fn push_context(engine: &mut Engine, file_path: Option<&str>, text: Option<&str>) -> Result<()> {
    if file_path.is_none() && text.is_none() {
        bail!("push_context requires a file path, text, or both");
    }

    let snapshot_path = transcript::save_snapshot(&engine.project_root, &engine.transcript, "push", None)?;
    engine.context_stack.push(snapshot_path);

    let file_contents = file_path.map(|p| resolve_context_file(engine, p)).transpose()?;
    let content = match (file_contents, text) {
        (Some(f), Some(t)) => format!("{f}\n\n{t}"),
        (Some(f), None) => f,
        (None, Some(t)) => t.to_string(),
        (None, None) => unreachable!("checked above"),
    };

    engine.transcript = vec![Message::system(engine.system_prompt.clone()), Message::user(content)];
    Ok(())
}

/// `pop_context(return_value)` (§4.7). Returns [`PopOutcome::ChildExit`]
/// when running as a spawned child — the caller must exit the process
/// with the given code after this returns.
pub fn pop_context(engine: &mut Engine, return_value: &str) -> Result<PopOutcome> {
    transcript::save_snapshot(&engine.project_root, &engine.transcript, "pop", Some(return_value))?;

    if let Some(agent_dir) = engine.identity.agent_dir.clone() {
        let result = ChildResult {
            status: "done".to_string(),
            return_value: serde_json::Value::String(return_value.to_string()),
            short_recap: short_recap(&engine.transcript),
            finished_at: Utc::now().to_rfc3339(),
        };
        tree::write_result(&agent_dir, &result)?;

        let mut state = tree::read_state(&agent_dir).unwrap_or(tree::ChildState {
            agent_id: engine.identity.agent_id.clone().unwrap_or_default(),
            parent_id: engine.identity.parent_id.clone().unwrap_or_default(),
            status: "active".to_string(),
            model_key: Some(engine.catalog.current_key.clone()),
            spawned_at: Utc::now().to_rfc3339(),
            cwd: engine.project_root.display().to_string(),
            pane_id: None,
            right_column_pane_id: None,
            auto_tool_approve: None,
        });
        state.status = "done".to_string();
        tree::write_state(&agent_dir, &state)?;
        tree::touch_notify_done(&agent_dir)?;

        return Ok(PopOutcome::ChildExit { code: 0 });
    }

    let synthetic = Message::user(format!("Return value from push/pop context: {return_value}"));
    match engine.context_stack.pop() {
        Some(snapshot_path) => {
            let mut loaded = transcript::load_snapshot(&snapshot_path)?;
            loaded.push(synthetic);
            engine.transcript = loaded;
        }
        None => {
            engine.transcript = vec![Message::system(engine.system_prompt.clone()), synthetic];
        }
    }

    Ok(PopOutcome::Popped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllModelsCache, ModelCatalog, ProvidersConfig};
    use crate::engine::AgentIdentity;
    use crate::tools::ToolRegistry;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("context-stack-test-{}-{}", std::process::id(), line!()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn engine(root: PathBuf) -> Engine {
        let catalog = ModelCatalog::new(HashMap::new(), ProvidersConfig::default(), AllModelsCache::default(), "m".to_string());
        Engine::new(reqwest::Client::new(), catalog, ToolRegistry::new(), "S".to_string(), AgentIdentity::default(), root)
    }

    #[test]
    fn short_recap_extracts_tagged_substring() {
        let transcript = vec![Message::assistant("before <short_recap>done the thing</short_recap> after")];
        assert_eq!(short_recap(&transcript), Some("done the thing".to_string()));
    }

    #[test]
    fn short_recap_absent_when_no_tags() {
        let transcript = vec![Message::assistant("no tags here")];
        assert_eq!(short_recap(&transcript), None);
    }

    #[test]
    fn push_then_pop_restores_original_transcript_plus_synthetic_message() {
        let root = tempdir();
        let mut engine = engine(root);
        engine.transcript.push(Message::user("hi"));
        let original_len = engine.transcript.len();

        push_context(&mut engine, None, Some("extra")).unwrap();
        assert_eq!(engine.transcript.len(), 2);
        assert_eq!(engine.transcript[1].text(), "extra");

        let outcome = pop_context(&mut engine, "result42").unwrap();
        assert_eq!(outcome, PopOutcome::Popped);
        assert_eq!(engine.transcript.len(), original_len + 1);
        assert_eq!(engine.transcript.last().unwrap().text(), "Return value from push/pop context: result42");
    }

    #[test]
    fn pop_without_prior_push_resets_to_system_prompt() {
        let root = tempdir();
        let mut engine = engine(root);
        engine.transcript.push(Message::user("hi"));

        let outcome = pop_context(&mut engine, "r").unwrap();
        assert_eq!(outcome, PopOutcome::Popped);
        assert_eq!(engine.transcript.len(), 2);
        assert_eq!(engine.transcript[0].role, Role::System);
    }

    #[test]
    fn pop_as_child_writes_result_and_signals_exit() {
        let root = tempdir();
        let mut engine = engine(root.clone());
        let agent_dir = root.join("child");
        engine.identity.agent_dir = Some(agent_dir.clone());

        let outcome = pop_context(&mut engine, "child-result").unwrap();
        assert_eq!(outcome, PopOutcome::ChildExit { code: 0 });

        let result = tree::read_result(&agent_dir).unwrap();
        assert_eq!(result.status, "done");
        assert!(agent_dir.join("notify").join("done").exists());
    }

    #[test]
    fn push_requires_at_least_one_of_file_or_text() {
        let root = tempdir();
        let mut engine = engine(root);
        assert!(push_context(&mut engine, None, None).is_err());
    }
}
