//! Agent dispatch subsystem for subagent.
//!
//! This module provides the core capabilities for running an external AI
//! agent CLI as a subprocess:
//!
//! - **Definition**: Agent definition files (frontmatter + system context)
//! - **Resolver**: Which CLI protocol to speak, with caller detection
//! - **Command**: Executable name and argument vector per CLI
//! - **Stream**: Incremental parsing of heterogeneous streaming JSON output
//! - **Executor**: Subprocess supervision with timeout and early termination
//!
//! # Design Philosophy
//!
//! The external CLIs are black boxes that emit line-delimited JSON (or plain
//! text) on stdout. All knowledge about a specific CLI is confined to two
//! leaf modules: `command` (how to invoke it) and `stream` (how to read it).
//! Everything else operates on the normalized [`ExecutionResult`].

mod command;
mod definition;
mod executor;
mod resolver;
mod stream;

// Re-export public API
pub use command::{CommandSpec, build_command};
pub use definition::{
    AgentDefinition, AgentListing, list_agents, load_agent, resolve_agents_dir,
    validate_agent_name,
};
pub use executor::{ExecStatus, ExecutionResult, execute_agent};
pub use resolver::{CallerDetect, CliKind, EnvCallerDetect, NoCallerDetect, resolve_cli};
pub use stream::StreamProcessor;
