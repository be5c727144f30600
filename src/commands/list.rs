//! Implementation of the `subagent list` command.

use crate::agent::{list_agents, resolve_agents_dir};
use crate::cli::ListArgs;
use crate::error::{Result, SubagentError};
use serde_json::json;

/// Execute the `subagent list` command.
///
/// Prints one JSON line naming each available agent definition and the
/// directory that was searched. An empty or missing directory is not an
/// error; it lists zero agents.
pub fn cmd_list(args: ListArgs) -> Result<()> {
    let agents_dir = resolve_agents_dir(args.agents_dir.as_deref(), args.cwd.as_deref());
    let agents = list_agents(&agents_dir);

    let payload = json!({
        "agents": agents,
        "agents_dir": agents_dir.display().to_string(),
    });
    let line = serde_json::to_string(&payload)
        .map_err(|e| SubagentError::UserError(format!("failed to serialize listing: {}", e)))?;
    println!("{line}");

    Ok(())
}
