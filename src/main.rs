//! Entry point for egg, a terminal multi-agent chat orchestrator.
//!
//! Loads `.env` and the JSON config pair, resolves this process's agent
//! identity (root, or a spawned child via `EG_*` env vars / CLI overrides),
//! builds the [`engine::Engine`], and dispatches into one-shot mode, the
//! `models` subcommand, or the interactive loop.

mod agent_tree;
mod cli;
mod config;
mod constants;
mod context_stack;
mod diff;
mod dispatcher;
mod engine;
mod format;
mod message;
mod output;
mod provider;
mod repl;
mod sanitize;
mod toolcall;
mod tools;
mod transcript;

use anyhow::{Context, Result};
use colored::Colorize;

use config::ModelCatalog;
use constants::{ENV_AGENT_DIR, ENV_AGENT_ID, ENV_DEFAULT_MODEL, ENV_PARENT_ID, ENV_TREE_ID, ENV_YES_TOOL_FLAG};
use engine::{AgentIdentity, Engine};

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn resolve_identity(cli: &cli::Cli) -> AgentIdentity {
    AgentIdentity {
        tree_id: cli.tree.clone().or_else(|| std::env::var(ENV_TREE_ID).ok()),
        parent_id: cli.parent.clone().or_else(|| std::env::var(ENV_PARENT_ID).ok()),
        agent_id: cli.agent.clone().or_else(|| std::env::var(ENV_AGENT_ID).ok()),
        agent_dir: std::env::var(ENV_AGENT_DIR).ok().map(std::path::PathBuf::from),
    }
}

fn resolve_initial_model(models: &std::collections::HashMap<String, config::ModelEntry>, providers: &config::ProvidersConfig) -> String {
    if let Ok(key) = std::env::var(ENV_DEFAULT_MODEL) {
        if models.contains_key(&key) {
            return key;
        }
    }
    if let Some(key) = &providers.meta.default_model {
        if models.contains_key(key) {
            return key.clone();
        }
    }
    models.keys().next().cloned().unwrap_or_default()
}

async fn build_engine() -> Result<(Engine, cli::Cli)> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();

    let mut warn_renderer = output::StdoutRenderer::new();
    let dir = config::config_dir();
    let (models, providers) = config::load_catalogs(&dir, &mut warn_renderer);

    let project_root = std::env::current_dir().context("resolving current directory")?;
    let system_prompt = config::load_system_prompt(&dir, &project_root);

    let initial_key = resolve_initial_model(&models, &providers);
    let all_models_cache_path = dir.join(constants::ALL_MODELS_CACHE_FILENAME);
    let all_models = provider::load_all_models_cache(&all_models_cache_path).unwrap_or_default();
    let catalog = ModelCatalog::new(models, providers, all_models, initial_key);
    catalog.require_nonempty()?;

    let identity = resolve_identity(&cli);
    let http = reqwest::Client::new();
    let tools = tools::ToolRegistry::with_builtins(project_root.clone());

    let mut engine = Engine::new(http, catalog, tools, system_prompt, identity, project_root);
    engine.yes_tool_flag = env_flag(ENV_YES_TOOL_FLAG);

    Ok((engine, cli))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (mut engine, cli) = match build_engine().await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(1);
        }
    };

    if let Some(cli::Commands::Models) = cli.command {
        for (provider, mut names) in engine.catalog.grouped_by_provider() {
            println!("{}", provider.bold());
            names.sort();
            for name in names {
                println!("  {name}");
            }
        }
        return Ok(());
    }

    if let Some(prompt) = cli.prompt {
        return repl::run_one_shot(&mut engine, &prompt).await;
    }

    repl::run_interactive(&mut engine).await
}
