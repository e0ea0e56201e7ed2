//! The fixed tool registry (§4.6).
//!
//! `bash`/`python`/`javascript`/`str_replace_editor`/`replace_lines` are
//! plain executors implementing [`Tool`] and live in the [`ToolRegistry`].
//! The agent-tree tools (`popContext`, `spawn_agent`, `spawn_agent_auto`,
//! `spawn_agents`, `wait_agents`, `list_agents`, `write_result`) need access
//! to the tree/context state that outlives a single call and are dispatched
//! directly by `dispatcher.rs` instead of through this registry.

pub mod agents;
pub mod bash;
pub mod editor;
pub mod javascript;
pub mod python;
pub mod replace_lines;
pub mod schema;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use bash::BashTool;
use editor::StrReplaceEditorTool;
use javascript::JavascriptTool;
use python::PythonTool;
use replace_lines::ReplaceLinesTool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_error: false }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_error: true }
    }
}

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<ToolResult>;
}

/// Registry of the process-local executor tools (§4.6).
///
/// Excludes the agent-tree tools, which need broader engine state than a
/// `Value -> ToolResult` call can carry and are matched separately in
/// `dispatcher.rs`.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolResult> {
        match self.get(name) {
            Some(tool) => tool.execute(input).await,
            None => Ok(ToolResult::error(format!("unknown tool: {name}"))),
        }
    }

    /// Registers `bash`, `python`, `javascript`, `str_replace_editor` and
    /// `replace_lines`, rooted at `project_root`.
    pub fn with_builtins(project_root: PathBuf) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BashTool::new(project_root.clone())));
        registry.register(Arc::new(PythonTool::new(project_root.clone())));
        registry.register(Arc::new(JavascriptTool::new()));
        registry.register(Arc::new(StrReplaceEditorTool::new(project_root.clone())));
        registry.register(Arc::new(ReplaceLinesTool::new(project_root)));
        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
