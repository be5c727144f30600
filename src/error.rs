//! Error types for the subagent CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//!
//! Only validation errors surface through this type: they are detected before
//! any process is spawned. Process-lifecycle failures (missing executable,
//! timeout, crash) are normalized into the `status`/`error` fields of an
//! [`ExecutionResult`](crate::agent::ExecutionResult) instead of propagating.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for subagent operations.
#[derive(Error, Debug)]
pub enum SubagentError {
    /// Agent name fails the filename-safe pattern or escapes the agents directory.
    #[error("invalid agent name: '{0}'")]
    InvalidAgentName(String),

    /// No agent definition file exists under either supported extension.
    #[error("agent definition not found: {0}")]
    AgentNotFound(String),

    /// CLI identifier outside the supported set.
    #[error("unknown CLI: '{0}' (supported: claude, cursor-agent, codex, gemini)")]
    UnsupportedCli(String),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),
}

impl SubagentError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SubagentError::InvalidAgentName(_) => exit_codes::USER_ERROR,
            SubagentError::AgentNotFound(_) => exit_codes::USER_ERROR,
            SubagentError::UnsupportedCli(_) => exit_codes::USER_ERROR,
            SubagentError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for subagent operations.
pub type Result<T> = std::result::Result<T, SubagentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_agent_name_has_user_error_exit_code() {
        let err = SubagentError::InvalidAgentName("../escape".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn agent_not_found_has_user_error_exit_code() {
        let err = SubagentError::AgentNotFound("missing".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn unsupported_cli_has_user_error_exit_code() {
        let err = SubagentError::UnsupportedCli("copilot".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = SubagentError::AgentNotFound("reviewer".to_string());
        assert_eq!(err.to_string(), "agent definition not found: reviewer");

        let err = SubagentError::UnsupportedCli("copilot".to_string());
        assert!(err.to_string().contains("copilot"));
        assert!(err.to_string().contains("supported"));
    }
}
