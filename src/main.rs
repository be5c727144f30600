//! Subagent: dispatch task prompts to external AI agent CLIs.
//!
//! This is the main entry point for the `subagent` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod agent;
pub mod error;
pub mod exit_codes;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // The machine-readable result line (if any) went to stdout;
            // the human-readable message goes to stderr.
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
