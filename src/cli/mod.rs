//! CLI argument parsing for subagent.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default invocation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;

/// Subagent: dispatch task prompts to external AI agent CLIs.
///
/// Agent behavior is described by definition files under an agents
/// directory; the matching CLI (claude, cursor-agent, codex, or gemini)
/// is launched as a subprocess and its streaming output is normalized
/// into a single JSON result line.
#[derive(Parser, Debug)]
#[command(name = "subagent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for subagent.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an agent on a task prompt.
    ///
    /// Loads the agent definition, resolves which CLI to invoke, executes
    /// it in the given working directory, and prints one JSON result line.
    Run(RunArgs),

    /// List available agent definitions.
    ///
    /// Prints names and short descriptions as JSON, sorted by name.
    List(ListArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Agent definition name (e.g., "reviewer").
    pub agent: String,

    /// Task prompt for the agent.
    #[arg(short, long)]
    pub prompt: String,

    /// Working directory for the agent process (absolute path).
    #[arg(long)]
    pub cwd: PathBuf,

    /// Force a specific CLI (claude, cursor-agent, codex, gemini).
    #[arg(long)]
    pub cli: Option<String>,

    /// Directory containing agent definitions.
    ///
    /// Defaults to $SUB_AGENTS_DIR, then `<cwd>/.agents`.
    #[arg(long)]
    pub agents_dir: Option<PathBuf>,

    /// Timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Directory containing agent definitions.
    #[arg(long)]
    pub agents_dir: Option<PathBuf>,

    /// Working directory used to locate the default agents directory.
    #[arg(long)]
    pub cwd: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
