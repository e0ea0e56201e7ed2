//! Centralized constants.
//!
//! All magic numbers, default strings, and well-known file/env names live
//! here so they can be changed in one place.

/// Root directory for all persisted state, relative to the current working
/// directory.
pub const STATE_DIR: &str = ".egg";

/// Transcript snapshot directory, under [`STATE_DIR`].
pub const LOCAL_CHATS_DIR: &str = "localChats";

/// Agent tree directory, under [`STATE_DIR`].
pub const AGENTS_DIR: &str = "agents";

/// File recording the currently active tree id, under the agents directory.
pub const CURRENT_TREE_FILE: &str = ".current_tree";

/// Default/root agent and parent id.
pub const ROOT_ID: &str = "root";

/// Config file names, resolved relative to the binary's directory (§4.1/§6).
pub const MODELS_CONFIG_FILENAME: &str = "models.json";
pub const PROVIDERS_CONFIG_FILENAME: &str = "providers.json";
pub const ALL_MODELS_CACHE_FILENAME: &str = "all-models.json";
pub const SYSTEM_PROMPT_FILENAME: &str = "systemPrompt";
pub const GLOBAL_COMMANDS_DIR: &str = "global_commands";

/// Fallback system prompt used if `systemPrompt` is missing.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Separator joining multiple tool invocation outputs from one dispatch
/// event into a single tool message (§4.6).
pub const SPLIT_RESULTS_SEPARATOR: &str = "\n\n==== SPLIT RESULTS ===\n\n";

/// Output recorded when the operator declines a tool call.
pub const SKIPPED_BY_USER: &str = "--- SKIPPED BY USER ---";

/// Tags delimiting an extractable short recap in assistant content (§4.7).
pub const SHORT_RECAP_OPEN: &str = "<short_recap>";
pub const SHORT_RECAP_CLOSE: &str = "</short_recap>";

/// Environment variable names.
pub const ENV_DEFAULT_MODEL: &str = "DEFAULT_MODEL";
pub const ENV_TREE_ID: &str = "EG_TREE_ID";
pub const ENV_PARENT_ID: &str = "EG_PARENT_ID";
pub const ENV_AGENT_ID: &str = "EG_AGENT_ID";
pub const ENV_AGENT_DIR: &str = "EG_AGENT_DIR";
pub const ENV_INIT_CONTEXT_FILE: &str = "EG_INIT_CONTEXT_FILE";
pub const ENV_CHILD_MODEL: &str = "EG_CHILD_MODEL";
pub const ENV_YES_TOOL_FLAG: &str = "EG_YES_TOOL_FLAG";
pub const ENV_TMUX: &str = "TMUX";

/// Timeouts (§5).
pub const STREAM_TIMEOUT_SECS: u64 = 120;
pub const CONTEXT_ONLY_TIMEOUT_SECS: u64 = 30;
pub const CATALOG_FETCH_TIMEOUT_SECS: u64 = 30;
pub const TMUX_QUERY_TIMEOUT_SECS: u64 = 10;
pub const WAIT_POLL_INTERVAL_SECS: u64 = 1;
pub const BASH_TIMEOUT_SECS: u64 = 60;

/// tmux session name prefix (§4.9): `egg-tree-<tree_id>`.
pub const TMUX_SESSION_PREFIX: &str = "egg-tree-";

/// Fixed registry of tool names (§4.6), in schema-listing order.
pub const TOOL_NAMES: &[&str] = &[
    "bash",
    "python",
    "javascript",
    "popContext",
    "str_replace_editor",
    "replace_lines",
    "spawn_agent",
    "spawn_agent_auto",
    "spawn_agents",
    "wait_agents",
    "list_agents",
    "write_result",
];
