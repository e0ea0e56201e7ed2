//! Agent-tree tool implementations (§4.6/§4.8/§4.9/§4.10): `spawn_agent`,
//! `spawn_agent_auto`, `spawn_agents`, `wait_agents`, `list_agents`,
//! `write_result`. These need the broader `Engine` context (current tree,
//! model catalog, project root) that a plain [`crate::tools::Tool`] call
//! doesn't carry, so the dispatcher calls them directly rather than
//! through the [`crate::tools::ToolRegistry`].

use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent_tree::launcher;
use crate::agent_tree::tree::{self, ChildState};
use crate::agent_tree::wait_agents as wait_agents_impl;
use crate::constants::ENV_YES_TOOL_FLAG;
use crate::engine::Engine;
use crate::message::Message;
use crate::tools::ToolResult;

#[derive(Deserialize)]
struct SpawnInput {
    label: String,
    context_text: String,
    #[serde(default)]
    tree_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    model_key: Option<String>,
}

fn resolve_tree_and_parent(engine: &Engine, tree_id: Option<String>, parent_id: Option<String>) -> Result<(String, String)> {
    let tree_id = match tree_id.or_else(|| engine.identity.tree_id.clone()) {
        Some(id) => id,
        None => tree::resolve_tree_id(&engine.project_root, Utc::now().timestamp() as u64)?,
    };
    let parent_id = parent_id.or_else(|| engine.identity.agent_id.clone()).unwrap_or_else(tree::resolve_parent_id);
    Ok((tree_id, parent_id))
}

/// Writes a new child's on-disk state, launches its pane, and returns its
/// allocated id.
async fn spawn_one(engine: &Engine, tree_id: &str, parent_id: &str, label: &str, context_text: &str, model_key: &str, auto_approve: bool) -> Result<String> {
    let child_id = tree::allocate_child_id(&engine.project_root, tree_id, parent_id, label)?;
    let child_dir = tree::child_dir(&engine.project_root, tree_id, parent_id, &child_id);
    std::fs::create_dir_all(&child_dir)?;

    std::fs::write(child_dir.join("init_context.txt"), context_text)?;
    let seed = vec![Message::system(engine.system_prompt.clone()), Message::user(context_text)];
    std::fs::write(child_dir.join("messages.json"), serde_json::to_string_pretty(&seed)?)?;

    let mut parent_state = tree::read_state(&tree::parent_dir(&engine.project_root, tree_id, parent_id))
        .unwrap_or(ChildState {
            agent_id: parent_id.to_string(),
            parent_id: "root".to_string(),
            status: "active".to_string(),
            model_key: None,
            spawned_at: Utc::now().to_rfc3339(),
            cwd: engine.project_root.display().to_string(),
            pane_id: None,
            right_column_pane_id: None,
            auto_tool_approve: None,
        });

    let pane = launcher::split_for_child(tree_id, &mut parent_state).await?;
    tree::write_state(&tree::parent_dir(&engine.project_root, tree_id, parent_id), &parent_state)?;

    let state = ChildState {
        agent_id: child_id.clone(),
        parent_id: parent_id.to_string(),
        status: "active".to_string(),
        model_key: Some(model_key.to_string()),
        spawned_at: Utc::now().to_rfc3339(),
        cwd: engine.project_root.display().to_string(),
        pane_id: Some(pane.id.clone()),
        right_column_pane_id: None,
        auto_tool_approve: Some(auto_approve),
    };
    tree::write_state(&child_dir, &state)?;

    let exe = std::env::current_exe().map(|p| p.display().to_string()).unwrap_or_else(|_| "egg".to_string());
    let script = launcher::render_run_script(
        &exe,
        tree_id,
        parent_id,
        &child_id,
        &child_dir,
        &child_dir.join("init_context.txt"),
        Some(model_key),
        auto_approve,
    );
    launcher::launch_child(&pane, &child_dir, &script).await?;

    Ok(child_id)
}

async fn spawn_with_auto(engine: &Engine, input: Value, auto_approve: bool) -> Result<ToolResult> {
    let mut input: SpawnInput = serde_json::from_value(input)?;
    if input.model_key.is_none() {
        input.model_key = Some(engine.catalog.current_key.clone());
    }
    let (tree_id, parent_id) = resolve_tree_and_parent(engine, input.tree_id, input.parent_id)?;
    let model_key = input.model_key.unwrap();

    match spawn_one(engine, &tree_id, &parent_id, &input.label, &input.context_text, &model_key, auto_approve).await {
        Ok(child_id) => Ok(ToolResult::success(json!({"tree_id": tree_id, "parent_id": parent_id, "agent_id": child_id}).to_string())),
        Err(e) => Ok(ToolResult::error(format!("Error executing spawn: {e}"))),
    }
}

pub async fn spawn_agent(engine: &Engine, input: Value) -> Result<ToolResult> {
    spawn_with_auto(engine, input, engine.yes_tool_flag || std::env::var(ENV_YES_TOOL_FLAG).is_ok()).await
}

pub async fn spawn_agent_auto(engine: &Engine, input: Value) -> Result<ToolResult> {
    spawn_with_auto(engine, input, true).await
}

#[derive(Deserialize)]
struct SpawnSpec {
    label: String,
    context_text: String,
    #[serde(default = "one")]
    count: usize,
}
fn one() -> usize {
    1
}

#[derive(Deserialize)]
struct SpawnAgentsInput {
    #[serde(default)]
    tree_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    specs: Vec<SpawnSpec>,
    #[serde(default)]
    max_active: Option<usize>,
}

/// `spawn_agents` (§9 Open Questions): flattens `specs` into individual
/// spawn requests in order, bounding how many are outstanding at once by
/// `max_active` (0/absent = unbounded).
pub async fn spawn_agents(engine: &Engine, input: Value) -> Result<ToolResult> {
    let input: SpawnAgentsInput = serde_json::from_value(input)?;
    let (tree_id, parent_id) = resolve_tree_and_parent(engine, input.tree_id, input.parent_id)?;
    let model_key = engine.catalog.current_key.clone();

    let mut spawned = Vec::new();
    let mut outstanding: Vec<String> = Vec::new();
    let cap = input.max_active.unwrap_or(0);

    for spec in &input.specs {
        for _ in 0..spec.count {
            if cap > 0 && outstanding.len() >= cap {
                let outcome = wait_agents_impl(&engine.project_root, &tree_id, outstanding.clone(), None, true).await?;
                outstanding.retain(|id| !outcome.completed.contains(id));
            }
            match spawn_one(engine, &tree_id, &parent_id, &spec.label, &spec.context_text, &model_key, false).await {
                Ok(child_id) => {
                    outstanding.push(child_id.clone());
                    spawned.push(child_id);
                }
                Err(e) => return Ok(ToolResult::error(format!("Error executing spawn_agents: {e}"))),
            }
        }
    }

    Ok(ToolResult::success(json!({"tree_id": tree_id, "parent_id": parent_id, "spawned": spawned}).to_string()))
}

#[derive(Deserialize, Default)]
struct WaitInput {
    #[serde(default)]
    which: Vec<String>,
    #[serde(default)]
    timeout_sec: Option<f64>,
    #[serde(default)]
    any_mode: bool,
}

pub async fn wait_agents(engine: &Engine, input: Value) -> Result<ToolResult> {
    let input: WaitInput = serde_json::from_value(input).unwrap_or_default();
    let tree_id = match engine.identity.tree_id.clone() {
        Some(id) => id,
        None => tree::resolve_tree_id(&engine.project_root, Utc::now().timestamp() as u64)?,
    };

    let outcome = wait_agents_impl(&engine.project_root, &tree_id, input.which, input.timeout_sec, input.any_mode).await?;
    Ok(ToolResult::success(serde_json::to_string(&outcome)?))
}

#[derive(Deserialize, Default)]
struct ListAgentsInput {
    #[serde(default)]
    tree_id: Option<String>,
}

pub fn list_agents(engine: &Engine, input: Value) -> Result<ToolResult> {
    let input: ListAgentsInput = serde_json::from_value(input).unwrap_or_default();
    let tree_id = input.tree_id.or_else(|| engine.identity.tree_id.clone());
    let Some(tree_id) = tree_id else {
        return Ok(ToolResult::error("no active tree to list agents for".to_string()));
    };
    let parent_id = engine.identity.agent_id.clone().unwrap_or_else(tree::resolve_parent_id);
    let children = tree::list_children(&engine.project_root, &tree_id, &parent_id)?;
    Ok(ToolResult::success(json!({"tree_id": tree_id, "parent_id": parent_id, "children": children}).to_string()))
}

/// `write_result(value)` (§9 Open Questions): a no-op-with-explanation
/// when not running as a spawned child, since there's no parent to read
/// the file.
pub fn write_result(engine: &Engine, input: Value) -> Result<ToolResult> {
    let Some(agent_dir) = engine.identity.agent_dir.clone() else {
        return Ok(ToolResult::error("write_result has no effect for the root agent: there is no parent to read result.json.".to_string()));
    };

    let value = input.get("value").cloned().unwrap_or(input);
    let result = tree::ChildResult {
        status: "done".to_string(),
        return_value: value,
        short_recap: crate::context_stack::short_recap(&engine.transcript),
        finished_at: Utc::now().to_rfc3339(),
    };
    tree::write_result(&agent_dir, &result)?;
    Ok(ToolResult::success("Wrote interim result.".to_string()))
}
