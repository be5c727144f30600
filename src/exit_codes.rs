//! Exit code constants for the subagent CLI.
//!
//! The process exit code mirrors the normalized result status:
//! - 0: the agent produced a result and finished cleanly
//! - 1: validation failure or process error
//!
//! Inside an `ExecutionResult`, two conventional shell codes are also used:
//! - 124: the child was killed because the timeout elapsed
//! - 127: the CLI executable was not found

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid agent name, or a failed execution.
pub const USER_ERROR: i32 = 1;

/// The child process was killed after the timeout elapsed.
pub const TIMEOUT: i32 = 124;

/// The CLI executable could not be found.
pub const NOT_FOUND: i32 = 127;
