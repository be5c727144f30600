//! Implementation of the `subagent run` command.
//!
//! Validates the invocation, loads the agent definition, resolves the CLI,
//! and hands off to the executor. Whatever happens, exactly one JSON result
//! line is printed on stdout; the process exit code is 0 only for a
//! `success` status.

use crate::agent::{
    CliKind, EnvCallerDetect, ExecutionResult, execute_agent, load_agent, resolve_agents_dir,
    resolve_cli,
};
use crate::cli::RunArgs;
use crate::error::{Result, SubagentError};

/// Execute the `subagent run` command.
///
/// Validation failures are not propagated raw: they are folded into a
/// well-formed error-status result line first, so hosting code can always
/// parse stdout.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let result = match prepare_and_execute(&args) {
        Ok(result) => result,
        Err(err) => ExecutionResult::validation_error(err.to_string()),
    };

    let line = serde_json::to_string(&result)
        .map_err(|e| SubagentError::UserError(format!("failed to serialize result: {}", e)))?;
    println!("{line}");

    if result.status.is_success() {
        Ok(())
    } else {
        Err(SubagentError::UserError(result.error.unwrap_or_else(
            || "agent execution did not succeed".to_string(),
        )))
    }
}

/// Validate inputs, resolve the agent and CLI, and run the agent.
///
/// Everything here happens before a process is spawned; errors short-circuit
/// with no child started.
fn prepare_and_execute(args: &RunArgs) -> Result<ExecutionResult> {
    if !args.cwd.is_absolute() {
        return Err(SubagentError::UserError(
            "cwd must be an absolute path".to_string(),
        ));
    }
    if !args.cwd.is_dir() {
        return Err(SubagentError::UserError(format!(
            "cwd does not exist: {}",
            args.cwd.display()
        )));
    }

    let agents_dir = resolve_agents_dir(args.agents_dir.as_deref(), Some(&args.cwd));
    let definition = load_agent(&agents_dir, &args.agent)?;

    let cli = match &args.cli {
        // An explicit override must name a supported CLI.
        Some(name) => name.parse::<CliKind>()?,
        None => resolve_cli(
            definition.run_agent.as_deref(),
            &EnvCallerDetect,
            CliKind::default(),
        ),
    };

    Ok(execute_agent(
        cli,
        &definition.system_context,
        &args.prompt,
        &args.cwd,
        args.timeout_ms,
    ))
}
