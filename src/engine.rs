//! The `Engine`: an explicit context struct threading config, transcript,
//! tool registry, and per-turn flags through call sites instead of the
//! process-wide globals the source relies on (§9 "Global mutable state").

use std::path::PathBuf;

use crate::config::ModelCatalog;
use crate::message::Message;
use crate::tools::ToolRegistry;

/// Identity this process is running under: either the root conversation,
/// or a spawned child agent (`EG_*` environment variables set by `run.sh`).
#[derive(Debug, Clone, Default)]
pub struct AgentIdentity {
    pub tree_id: Option<String>,
    pub parent_id: Option<String>,
    pub agent_id: Option<String>,
    /// Set only for spawned children; `popContext`/`write_result` use its
    /// presence to decide whether they're running as a child at all.
    pub agent_dir: Option<PathBuf>,
}

impl AgentIdentity {
    pub fn is_child(&self) -> bool {
        self.agent_dir.is_some()
    }
}

pub struct Engine {
    pub http: reqwest::Client,
    pub catalog: ModelCatalog,
    pub tools: ToolRegistry,
    pub transcript: Vec<Message>,
    /// Snapshot paths pushed by `pushContext`, popped by `popContext`.
    pub context_stack: Vec<PathBuf>,
    pub identity: AgentIdentity,
    pub project_root: PathBuf,
    pub system_prompt: String,

    /// Global tool auto-approve (`/toggleYesToolFlag`, `EG_YES_TOOL_FLAG`).
    pub yes_tool_flag: bool,
    /// Single-turn auto-approve armed by answering `a` to a confirmation
    /// prompt; reset at the start of every user turn.
    pub armed_for_turn: bool,
    pub show_thinking: bool,
}

impl Engine {
    pub fn new(
        http: reqwest::Client,
        catalog: ModelCatalog,
        tools: ToolRegistry,
        system_prompt: String,
        identity: AgentIdentity,
        project_root: PathBuf,
    ) -> Self {
        Self {
            http,
            catalog,
            tools,
            transcript: vec![Message::system(system_prompt.clone())],
            context_stack: Vec::new(),
            identity,
            project_root,
            system_prompt,
            yes_tool_flag: false,
            armed_for_turn: false,
            show_thinking: false,
        }
    }

    /// Resets the single-turn auto-approve flag; called at the start of
    /// every user turn (§9).
    pub fn begin_turn(&mut self) {
        self.armed_for_turn = false;
    }

    pub fn should_auto_approve(&self) -> bool {
        self.yes_tool_flag || self.armed_for_turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_identity_requires_agent_dir() {
        let mut identity = AgentIdentity::default();
        assert!(!identity.is_child());
        identity.agent_dir = Some(PathBuf::from("/tmp/agent"));
        assert!(identity.is_child());
    }
}
