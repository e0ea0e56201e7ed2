//! Conversation loop and command table (§4.12).
//!
//! Operator input is matched top-to-bottom against a fixed prefix table;
//! the first match wins, anything unmatched is sent as a user message.
//! Every command is also appended verbatim to the transcript as a `user`
//! message, preserving the conversational record even for meta-commands —
//! except `pushContext`/`popContext`, whose own transcript-shape contract
//! (§8 scenario 3) already fully accounts for what gets appended.

use std::collections::HashMap;

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::DefaultEditor;
use serde_json::json;

use crate::config::Resolution;
use crate::context_stack::{self, PopOutcome};
use crate::dispatcher::{self, ConfirmAnswer, Confirmer};
use crate::engine::Engine;
use crate::message::{Message, ToolCall, ToolCallFunction};
use crate::output::{Renderer, StdoutRenderer};
use crate::provider;
use crate::sanitize::sanitize;
use crate::tools::schema::llm_tool_schema;
use crate::toolcall::parse_tool_calls_from_content;

/// Reads `y`/`n`/`a` from stdin before each tool invocation.
struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn ask(&mut self, tool_name: &str, args: &serde_json::Value) -> ConfirmAnswer {
        eprint!("{} {} {} ", "run".yellow(), tool_name.bold(), "[y/n/a]?".dimmed());
        use std::io::Write;
        std::io::stderr().flush().ok();
        let _ = args;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return ConfirmAnswer::No;
        }
        match line.trim() {
            "a" | "A" => ConfirmAnswer::Always,
            "y" | "Y" | "" => ConfirmAnswer::Yes,
            _ => ConfirmAnswer::No,
        }
    }
}

/// Runs one user turn to completion: send, stream, apply content-fallback
/// parsing, dispatch tool calls, and repeat until the model yields without
/// tool calls (or the stream is interrupted).
pub async fn run_turn(engine: &mut Engine, renderer: &mut dyn Renderer) -> Result<()> {
    loop {
        let sanitized = sanitize(&engine.transcript);
        let entry = engine.catalog.current_entry().context("no active model")?.clone();
        let provider_entry = engine
            .catalog
            .providers
            .providers
            .get(&entry.provider)
            .with_context(|| format!("unknown provider {}", entry.provider))?;
        let api_key = std::env::var(&provider_entry.api_key_env).unwrap_or_default();
        let tools_schema = llm_tool_schema();

        let outcome = provider::stream_completion(
            &engine.http,
            &provider_entry.api_base,
            &api_key,
            &entry.model_name,
            &sanitized,
            &tools_schema,
            renderer,
            engine.show_thinking,
        )
        .await;
        renderer.render_done();

        let model_key = engine.catalog.current_key.clone();

        if outcome.interrupted {
            let mut msg = if outcome.tool_calls.is_empty() {
                Message::assistant(outcome.content)
            } else {
                Message::assistant_tool_calls(outcome.tool_calls)
            };
            msg.model_key = Some(model_key);
            engine.transcript.push(msg);
            return Ok(());
        }

        let assistant_message = if outcome.tool_calls.is_empty() && !outcome.content.trim().is_empty() {
            match parse_tool_calls_from_content(&outcome.content) {
                Some(parsed) => {
                    let tool_calls: Vec<ToolCall> = parsed
                        .calls
                        .into_iter()
                        .map(|c| ToolCall {
                            id: provider::generate_call_id(),
                            kind: "function".to_string(),
                            function: ToolCallFunction { name: c.name, arguments: c.arguments },
                        })
                        .collect();
                    let mut msg = Message::assistant_tool_calls(tool_calls);
                    if !parsed.should_redisplay {
                        msg.content = Some(outcome.content);
                    }
                    msg
                }
                None => Message::assistant(outcome.content),
            }
        } else if outcome.tool_calls.is_empty() {
            Message::assistant(outcome.content)
        } else {
            let mut msg = Message::assistant_tool_calls(outcome.tool_calls);
            if !outcome.content.is_empty() {
                msg.content = Some(outcome.content);
            }
            msg
        };

        let has_tool_calls = assistant_message.tool_calls.as_ref().is_some_and(|c| !c.is_empty());
        let mut assistant_message = assistant_message;
        assistant_message.model_key = Some(model_key);
        engine.transcript.push(assistant_message);

        if !has_tool_calls {
            return Ok(());
        }

        let tool_calls = engine.transcript.last().unwrap().tool_calls.clone().unwrap_or_default();
        let mut confirmer = StdinConfirmer;
        dispatcher::dispatch(engine, &tool_calls, &mut confirmer).await?;
        // loop again: the dispatched tool results are now in the
        // transcript, so the next iteration sends a follow-up request.
    }
}

fn print_model_list(engine: &Engine) {
    let grouped: HashMap<String, Vec<String>> = engine.catalog.grouped_by_provider();
    let mut providers: Vec<&String> = grouped.keys().collect();
    providers.sort();
    for provider in providers {
        println!("{}", provider.bold());
        for name in &grouped[provider] {
            let marker = if *name == engine.catalog.current_key { "*" } else { " " };
            println!("  {marker} {name}");
        }
    }
}

/// Parses `/spawn [file.md] <text> [--tree X --parent Y --label Z --count N]`
/// into a `spawn_agents` argument object.
fn parse_spawn_command(rest: &str) -> serde_json::Value {
    let mut words: Vec<&str> = rest.split_whitespace().collect();
    let mut tree_id = None;
    let mut parent_id = None;
    let mut label = "agent".to_string();
    let mut count = 1usize;
    let mut flag_positions = Vec::new();

    let mut i = 0;
    while i < words.len() {
        match words[i] {
            "--tree" if i + 1 < words.len() => {
                tree_id = Some(words[i + 1].to_string());
                flag_positions.extend([i, i + 1]);
                i += 2;
            }
            "--parent" if i + 1 < words.len() => {
                parent_id = Some(words[i + 1].to_string());
                flag_positions.extend([i, i + 1]);
                i += 2;
            }
            "--label" if i + 1 < words.len() => {
                label = words[i + 1].to_string();
                flag_positions.extend([i, i + 1]);
                i += 2;
            }
            "--count" if i + 1 < words.len() => {
                count = words[i + 1].parse().unwrap_or(1);
                flag_positions.extend([i, i + 1]);
                i += 2;
            }
            _ => i += 1,
        }
    }

    let text_words: Vec<&str> = words
        .drain(..)
        .enumerate()
        .filter(|(idx, _)| !flag_positions.contains(idx))
        .map(|(_, w)| w)
        .collect();
    let text = text_words.join(" ");

    json!({
        "tree_id": tree_id,
        "parent_id": parent_id,
        "specs": [{"label": label, "context_text": text, "count": count}],
    })
}

/// Dispatches one synthesized tool call (`/spawn`, `/wait`) without going
/// through the model.
async fn run_synthetic_tool_call(engine: &mut Engine, name: &str, args: serde_json::Value) -> Result<()> {
    let call = ToolCall {
        id: provider::generate_call_id(),
        kind: "function".to_string(),
        function: ToolCallFunction { name: name.to_string(), arguments: args.to_string() },
    };
    let mut msg = Message::assistant_tool_calls(vec![call.clone()]);
    msg.model_key = Some(engine.catalog.current_key.clone());
    engine.transcript.push(msg);

    let mut confirmer = StdinConfirmer;
    dispatcher::dispatch(engine, &[call], &mut confirmer).await
}

/// Matches one line of operator input against the command table and
/// applies its effect. Returns `Ok(true)` if the REPL should keep running.
async fn handle_line(engine: &mut Engine, renderer: &mut dyn Renderer, line: &str) -> Result<bool> {
    if let Some(script) = line.strip_prefix("b ") {
        let output = std::process::Command::new("bash").arg("-c").arg(script).current_dir(&engine.project_root).output();
        let text = match output {
            Ok(out) => format!("{}{}", String::from_utf8_lossy(&out.stdout), String::from_utf8_lossy(&out.stderr)),
            Err(e) => format!("failed to run: {e}"),
        };
        println!("{text}");
        engine.transcript.push(Message::user(format!("[local] $ {script}\n{text}")).local_tool());

        let context_message = format!("$ {script}\n{text}");
        if let Some(entry) = engine.catalog.current_entry().cloned() {
            if let Some(provider_entry) = engine.catalog.providers.providers.get(&entry.provider).cloned() {
                let api_key = std::env::var(&provider_entry.api_key_env).unwrap_or_default();
                let sanitized = sanitize(&engine.transcript);
                let tools_schema = llm_tool_schema();
                provider::send_context_only(
                    &engine.http,
                    &provider_entry.api_base,
                    &api_key,
                    &entry.model_name,
                    &sanitized,
                    &tools_schema,
                    &context_message,
                    renderer,
                )
                .await;
            }
        }
        return Ok(true);
    }

    if let Some(name) = line.strip_prefix("o ") {
        match crate::transcript::find_snapshot(&engine.project_root, name.trim()) {
            Ok(path) => match crate::transcript::load_snapshot(&path) {
                Ok(messages) => {
                    engine.transcript = messages;
                    engine.transcript.push(Message::user(line));
                    println!("loaded {}", path.display());
                }
                Err(e) => renderer.render_error(&e.to_string()),
            },
            Err(e) => renderer.render_error(&e.to_string()),
        }
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/model") {
        let key = rest.trim();
        if key.is_empty() {
            print_model_list(engine);
        } else {
            let mut resolution = engine.catalog.resolve(key);
            // `all:<provider>:<id>` virtual keys (§4.11) resolve only
            // against a cached /models listing; lazily fetch and retry
            // once before giving up.
            if matches!(resolution, Resolution::Unknown) {
                if let Some(provider_name) = key.strip_prefix("all:").and_then(|rest| rest.split(':').next()) {
                    if let Some(provider_entry) = engine.catalog.providers.providers.get(provider_name).cloned() {
                        let api_key = std::env::var(&provider_entry.api_key_env).unwrap_or_default();
                        let dir = crate::config::config_dir();
                        if provider::update_all_models(&engine.http, &dir, provider_name, &provider_entry, &api_key).await.is_ok() {
                            if let Ok(cache) = provider::load_all_models_cache(&dir.join(crate::constants::ALL_MODELS_CACHE_FILENAME)) {
                                engine.catalog.all_models = cache;
                            }
                            resolution = engine.catalog.resolve(key);
                        }
                    }
                }
            }
            match resolution {
                Resolution::Unknown => {
                    renderer.warn(&format!("unknown model key: {key}"));
                    print_model_list(engine);
                }
                resolution => {
                    engine.catalog.apply(resolution);
                    println!("switched to {}", engine.catalog.current_key);
                }
            }
        }
        engine.transcript.push(Message::user(line));
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/pushContext") {
        let rest = rest.trim();
        let (file_path, text) = match rest.split_once(' ') {
            Some((f, t)) if f.ends_with(".md") => (Some(f), Some(t)),
            _ if rest.ends_with(".md") && !rest.is_empty() => (Some(rest), None),
            _ if !rest.is_empty() => (None, Some(rest)),
            _ => (None, None),
        };
        if let Err(e) = context_stack::push_context(engine, file_path, text) {
            renderer.render_error(&e.to_string());
        } else {
            run_turn(engine, renderer).await?;
        }
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/popContext") {
        let return_value = rest.trim();
        match context_stack::pop_context(engine, return_value) {
            Ok(PopOutcome::ChildExit { code }) => std::process::exit(code),
            Ok(PopOutcome::Popped) => {}
            Err(e) => renderer.render_error(&e.to_string()),
        }
        return Ok(true);
    }

    if line.trim() == "/toggleYesToolFlag" {
        engine.yes_tool_flag = !engine.yes_tool_flag;
        println!("tool auto-approve: {}", engine.yes_tool_flag);
        engine.transcript.push(Message::user(line));
        return Ok(true);
    }

    if line.trim() == "/toggleThinkingDisplay" {
        engine.show_thinking = !engine.show_thinking;
        println!("show thinking: {}", engine.show_thinking);
        engine.transcript.push(Message::user(line));
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/spawn") {
        let args = parse_spawn_command(rest.trim());
        run_synthetic_tool_call(engine, "spawn_agents", args).await?;
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/wait") {
        let args: serde_json::Value = serde_json::from_str(rest.trim()).unwrap_or(json!({"which": []}));
        run_synthetic_tool_call(engine, "wait_agents", args).await?;
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/tree") {
        let tree_id = rest.trim();
        let status = std::process::Command::new("tmux").args(["list-panes", "-t", &crate::agent_tree::launcher::session_name(tree_id)]).status();
        if status.is_err() {
            renderer.warn("tmux is not available");
        }
        return Ok(true);
    }

    if let Some(rest) = line.strip_prefix("/attach") {
        let target = rest.trim().split_whitespace().next().unwrap_or_default();
        let status = std::process::Command::new("tmux").args(["attach", "-t", &crate::agent_tree::launcher::session_name(target)]).status();
        if status.is_err() {
            renderer.warn("tmux is not available");
        }
        return Ok(true);
    }

    engine.begin_turn();
    engine.transcript.push(Message::user(line));
    run_turn(engine, renderer).await?;
    Ok(true)
}

/// Runs the interactive loop until EOF or an operator interrupt at the
/// prompt (§5: a clean shutdown — save transcript, exit).
pub async fn run_interactive(engine: &mut Engine) -> Result<()> {
    println!("{}", "egg — multi-agent chat orchestrator".bold());
    println!("{}", format!("model: {}", engine.catalog.current_key).dimmed());

    let mut editor = DefaultEditor::new()?;
    let mut renderer = StdoutRenderer::new();

    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                editor.add_history_entry(&line).ok();
                if !handle_line(engine, &mut renderer, &line).await? {
                    break;
                }
            }
            Err(_) => {
                crate::transcript::save_snapshot(&engine.project_root, &engine.transcript, "exit", None).ok();
                break;
            }
        }
    }

    Ok(())
}

/// One-shot mode (`--prompt`, §10): send a single message and exit after
/// the assistant's turn completes, without entering the REPL.
pub async fn run_one_shot(engine: &mut Engine, prompt: &str) -> Result<()> {
    let mut renderer = StdoutRenderer::new();
    engine.begin_turn();
    engine.transcript.push(Message::user(prompt));
    run_turn(engine, &mut renderer).await
}
