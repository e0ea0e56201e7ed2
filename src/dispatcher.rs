//! Tool dispatcher (§4.6): confirmation policy, argument/name repair,
//! routing to the tool registry or the agent-tree tools, and output
//! aggregation.

use anyhow::Result;
use serde_json::Value;

use crate::constants::SKIPPED_BY_USER;
use crate::constants::SPLIT_RESULTS_SEPARATOR;
use crate::context_stack::{self, PopOutcome};
use crate::engine::Engine;
use crate::message::{Message, ToolCall};
use crate::toolcall::{repair_arguments, split_tool_names};
use crate::tools::{agents, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAnswer {
    Yes,
    Always,
    No,
}

/// Prompts the operator for `y`/`n`/`a` before executing one invocation.
/// Implemented by the REPL's stdin/stdout adapter; a test double can
/// script fixed answers.
pub trait Confirmer {
    fn ask(&mut self, tool_name: &str, args: &Value) -> ConfirmAnswer;
}

/// A last-resort name-split heuristic (§4.5): when the apparent name
/// couldn't be split and every repaired argument object carries
/// `context_text`, assume the model meant `spawn_agent` for all of them.
fn looks_like_spawn(args: &[Value]) -> bool {
    !args.is_empty() && args.iter().all(|a| a.get("context_text").is_some())
}

async fn route_call(engine: &mut Engine, name: &str, args: Value) -> Result<ToolResult> {
    match name {
        "popContext" => {
            let return_value = args.get("return_value").and_then(Value::as_str).unwrap_or_default().to_string();
            match context_stack::pop_context(engine, &return_value)? {
                PopOutcome::ChildExit { code } => std::process::exit(code),
                PopOutcome::Popped => Ok(ToolResult::success(format!("Popped context with return value: {return_value}"))),
            }
        }
        "write_result" => agents::write_result(engine, args),
        "spawn_agent" => agents::spawn_agent(engine, args).await,
        "spawn_agent_auto" => agents::spawn_agent_auto(engine, args).await,
        "spawn_agents" => agents::spawn_agents(engine, args).await,
        "wait_agents" => agents::wait_agents(engine, args).await,
        "list_agents" => agents::list_agents(engine, args),
        _ => engine.tools.execute(name, args.clone()).await.or_else(|e| Ok(ToolResult::error(format!("Error executing {name}: {e}")))),
    }
}

/// Dispatches one assistant-turn's tool calls, appending the resulting
/// tool messages to `engine.transcript` in dispatch order.
pub async fn dispatch(engine: &mut Engine, tool_calls: &[ToolCall], confirmer: &mut dyn Confirmer) -> Result<()> {
    for call in tool_calls {
        let mut arg_list = repair_arguments(&call.function.arguments);
        if arg_list.is_empty() {
            engine.transcript.push(Message::tool(call.function.name.clone(), call.id.clone(), "Error: Invalid arguments."));
            continue;
        }

        let mut names = split_tool_names(&call.function.name, arg_list.len());
        if names.iter().all(|n| n == &call.function.name) && names.len() > 1 && looks_like_spawn(&arg_list) {
            names = vec!["spawn_agent".to_string(); names.len()];
        }
        // split_tool_names guarantees len() == arg_list.len(); zip is exact.
        debug_assert_eq!(names.len(), arg_list.len());

        let mut outputs = Vec::with_capacity(arg_list.len());
        for (name, args) in names.drain(..).zip(arg_list.drain(..)) {
            let output = if engine.should_auto_approve() {
                execute_and_format(engine, &name, args).await?
            } else {
                match confirmer.ask(&name, &args) {
                    ConfirmAnswer::Yes => execute_and_format(engine, &name, args).await?,
                    ConfirmAnswer::Always => {
                        engine.armed_for_turn = true;
                        execute_and_format(engine, &name, args).await?
                    }
                    ConfirmAnswer::No => SKIPPED_BY_USER.to_string(),
                }
            };
            outputs.push(output);
        }

        let joined = outputs.join(SPLIT_RESULTS_SEPARATOR);
        engine.transcript.push(Message::tool(call.function.name.clone(), call.id.clone(), joined));
    }

    Ok(())
}

async fn execute_and_format(engine: &mut Engine, name: &str, args: Value) -> Result<String> {
    let result = route_call(engine, name, args).await?;
    if result.is_error {
        Ok(format!("Error executing {name}: {}", result.content))
    } else {
        Ok(result.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllModelsCache, ModelCatalog, ProvidersConfig};
    use crate::engine::AgentIdentity;
    use crate::message::ToolCallFunction;
    use crate::tools::ToolRegistry;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct AlwaysYes;
    impl Confirmer for AlwaysYes {
        fn ask(&mut self, _tool_name: &str, _args: &Value) -> ConfirmAnswer {
            ConfirmAnswer::Yes
        }
    }

    struct AlwaysNo;
    impl Confirmer for AlwaysNo {
        fn ask(&mut self, _tool_name: &str, _args: &Value) -> ConfirmAnswer {
            ConfirmAnswer::No
        }
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dispatcher-test-{}-{}", std::process::id(), line!()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn engine(root: PathBuf) -> Engine {
        let catalog = ModelCatalog::new(HashMap::new(), ProvidersConfig::default(), AllModelsCache::default(), "m".to_string());
        let mut e = Engine::new(reqwest::Client::new(), catalog, ToolRegistry::with_builtins(root.clone()), "S".to_string(), AgentIdentity::default(), root);
        e.yes_tool_flag = false;
        e
    }

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall { id: "call_1".to_string(), kind: "function".to_string(), function: ToolCallFunction { name: name.to_string(), arguments: args.to_string() } }
    }

    #[tokio::test]
    async fn splits_concatenated_bash_arguments_and_joins_with_separator() {
        let root = tempdir();
        let mut engine = engine(root);
        let calls = vec![call("bash", r#"{"script":"echo 1"}{"script":"echo 2"}"#)];
        dispatch(&mut engine, &calls, &mut AlwaysYes).await.unwrap();

        let tool_msg = engine.transcript.last().unwrap();
        assert_eq!(tool_msg.name.as_deref(), Some("bash"));
        let content = tool_msg.text();
        assert!(content.contains("1"));
        assert!(content.contains("==== SPLIT RESULTS ==="));
        assert!(content.contains("2"));
    }

    #[tokio::test]
    async fn declining_records_skipped_marker() {
        let root = tempdir();
        let mut engine = engine(root);
        let calls = vec![call("bash", r#"{"script":"echo hi"}"#)];
        dispatch(&mut engine, &calls, &mut AlwaysNo).await.unwrap();

        assert_eq!(engine.transcript.last().unwrap().text(), SKIPPED_BY_USER);
    }

    #[tokio::test]
    async fn invalid_arguments_report_fixed_error_message() {
        let root = tempdir();
        let mut engine = engine(root);
        let calls = vec![call("bash", "not json at all and no braces")];
        dispatch(&mut engine, &calls, &mut AlwaysYes).await.unwrap();

        assert_eq!(engine.transcript.last().unwrap().text(), "Error: Invalid arguments.");
    }

    #[tokio::test]
    async fn auto_approve_skips_the_confirmer() {
        let root = tempdir();
        let mut engine = engine(root);
        engine.yes_tool_flag = true;
        let calls = vec![call("bash", r#"{"script":"echo auto"}"#)];
        dispatch(&mut engine, &calls, &mut AlwaysNo).await.unwrap();

        assert!(engine.transcript.last().unwrap().text().contains("auto"));
    }
}
