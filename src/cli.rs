//! Command-line interface definition and dispatch (§10 ambient stack).
//!
//! Uses [`clap`]'s derive API, matching the teacher's flat `Cli`/`Commands`
//! shape. `--tree`/`--parent`/`--agent` mirror the `EG_*` environment
//! variables a `run.sh` sets for a spawned child, so a human can launch a
//! root agent under an explicit identity the same way.

use anyhow::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "egg", about = "Multi-agent chat orchestrator")]
pub struct Cli {
    /// Override the agent tree id (mirrors EG_TREE_ID).
    #[arg(long)]
    pub tree: Option<String>,

    /// Override the parent agent id (mirrors EG_PARENT_ID).
    #[arg(long)]
    pub parent: Option<String>,

    /// Override this agent's own id (mirrors EG_AGENT_ID).
    #[arg(long)]
    pub agent: Option<String>,

    /// Send a single message and exit after the assistant's turn
    /// completes, instead of entering the interactive loop.
    #[arg(long)]
    pub prompt: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// List the resolved model catalog, grouped by provider.
    Models,
}

pub fn parse() -> Cli {
    Cli::parse()
}
