//! Agent subprocess supervisor.
//!
//! Spawns an agent CLI, drains its stdout line by line through a
//! [`StreamProcessor`], terminates the child as soon as a result is
//! detected, and enforces a single timeout budget across the drain and
//! wait phases. Every outcome, including spawn failures, timeouts, and
//! crashes, is normalized into an [`ExecutionResult`]; nothing here
//! propagates as an error to the caller.

use crate::agent::{CliKind, CommandSpec, StreamProcessor, build_command};
use crate::exit_codes;
use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Exit code observed when the child dies from our own SIGTERM (128 + 15).
const SIGTERM_EXIT_CODE: i32 = 143;

/// Poll interval for the bounded process wait.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for drained stderr once the child has already exited.
///
/// Normally EOF arrives immediately; the bound only matters when an orphaned
/// grandchild inherited the pipe and keeps it open.
const STDERR_COLLECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Normalized outcome status of one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    /// The agent produced a result and exited cleanly (or was terminated
    /// by our own graceful stop after the result arrived).
    Success,
    /// A result was obtained despite an unexpected exit code or timeout.
    Partial,
    /// No usable result.
    Error,
}

impl ExecStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecStatus::Success)
    }
}

/// Normalized result of one agent invocation.
///
/// Produced exactly once per invocation and serialized as a single JSON
/// line on stdout.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// The extracted result text (empty when nothing usable was parsed).
    pub result: String,
    /// Exit code of the child, or a conventional code for supervisor-level
    /// failures (124 timeout, 127 executable not found).
    pub exit_code: i32,
    /// Outcome classification.
    pub status: ExecStatus,
    /// The CLI that was invoked. Absent only for failures detected before
    /// a CLI was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli: Option<CliKind>,
    /// Wall-clock duration of the invocation.
    pub duration_ms: u64,
    /// Human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// An error result for a failure detected before any CLI was resolved.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self {
            result: String::new(),
            exit_code: exit_codes::USER_ERROR,
            status: ExecStatus::Error,
            cli: None,
            duration_ms: 0,
            error: Some(message.into()),
        }
    }
}

/// Execute an agent CLI and normalize its outcome.
///
/// The system context and prompt are combined into one payload with the
/// context demarcated before the task:
///
/// ```text
/// [System Context]
/// <system_context>
///
/// [User Prompt]
/// <prompt>
/// ```
///
/// The child runs rooted at `cwd`. Its stdout is parsed incrementally; as
/// soon as a final result is detected the child is asked to stop. The
/// timeout budget covers both the output-reading phase and the process-wait
/// phase.
pub fn execute_agent(
    cli: CliKind,
    system_context: &str,
    prompt: &str,
    cwd: &Path,
    timeout_ms: u64,
) -> ExecutionResult {
    let payload = format!("[System Context]\n{system_context}\n\n[User Prompt]\n{prompt}");
    let spec = build_command(cli, &payload);
    run_command(&spec, cli, cwd, timeout_ms)
}

/// Spawn a command spec and supervise it to completion.
fn run_command(spec: &CommandSpec, cli: CliKind, cwd: &Path, timeout_ms: u64) -> ExecutionResult {
    let started = Instant::now();
    let deadline = started + Duration::from_millis(timeout_ms);

    let mut child = match Command::new(spec.program)
        .args(&spec.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ExecutionResult {
                result: String::new(),
                exit_code: exit_codes::NOT_FOUND,
                status: ExecStatus::Error,
                cli: Some(cli),
                duration_ms: elapsed_ms(started),
                error: Some(format!("CLI not found: {}", spec.program)),
            };
        }
        Err(err) => {
            return ExecutionResult {
                result: String::new(),
                exit_code: exit_codes::USER_ERROR,
                status: ExecStatus::Error,
                cli: Some(cli),
                duration_ms: elapsed_ms(started),
                error: Some(format!("failed to spawn {}: {}", spec.program, err)),
            };
        }
    };

    supervise(&mut child, cli, timeout_ms, started, deadline)
}

/// Drain, wait, and classify a spawned child.
fn supervise(
    child: &mut Child,
    cli: CliKind,
    timeout_ms: u64,
    started: Instant,
    deadline: Instant,
) -> ExecutionResult {
    // Pipes were requested at spawn; absence here is a supervisor bug, but
    // it is still normalized rather than panicking.
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return ExecutionResult {
            result: String::new(),
            exit_code: exit_codes::USER_ERROR,
            status: ExecStatus::Error,
            cli: Some(cli),
            duration_ms: elapsed_ms(started),
            error: Some("failed to capture child output pipes".to_string()),
        };
    };

    // Stderr is drained on a helper thread so a chatty child cannot fill the
    // pipe buffer and deadlock against our stdout reads. The thread is never
    // joined: an orphaned grandchild can hold the pipe open indefinitely, so
    // the collected text is handed back over a channel instead.
    let (stderr_tx, stderr_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut buf);
        let _ = stderr_tx.send(buf);
    });

    // Stdout lines arrive over a channel so the drain loop can block with a
    // deadline instead of blocking forever on a silent child.
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut processor = StreamProcessor::new();
    let mut raw_lines: Vec<String> = Vec::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return finish_timed_out(child, &processor, cli, timeout_ms, started);
        }

        match line_rx.recv_timeout(remaining) {
            Ok(line) => {
                let ready = processor.process_line(&line);
                raw_lines.push(line);
                if ready {
                    // Result in hand: stop reading and ask the child to stop.
                    terminate_gracefully(child);
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break, // EOF
            Err(RecvTimeoutError::Timeout) => {
                return finish_timed_out(child, &processor, cli, timeout_ms, started);
            }
        }
    }
    drop(line_rx);

    // Bounded wait for exit; the graceful stop escalates to a hard kill if
    // the child outlives the remaining budget.
    let exit_status = match wait_with_deadline(child, deadline) {
        Some(status) => status,
        None => {
            return finish_timed_out(child, &processor, cli, timeout_ms, started);
        }
    };

    let exit_code = exit_status_code(&exit_status);
    let has_result = processor.result().is_some();

    let status = if exit_code == 0 || (exit_code == SIGTERM_EXIT_CODE && has_result) {
        ExecStatus::Success
    } else if has_result {
        ExecStatus::Partial
    } else {
        ExecStatus::Error
    };

    // Prefer the parsed result; fall back to raw stdout so plain-text
    // output is not lost.
    let result_text = processor
        .result_text()
        .unwrap_or_else(|| raw_lines.join("\n"));

    let error = if status == ExecStatus::Error {
        let mut message = format!("CLI exited with code {}", exit_code);
        let stderr_output = collect_stderr(&stderr_rx);
        let stderr_trimmed = stderr_output.trim();
        if !stderr_trimmed.is_empty() {
            message.push_str(": ");
            message.push_str(stderr_trimmed);
        }
        Some(message)
    } else {
        None
    };

    ExecutionResult {
        result: result_text,
        exit_code,
        status,
        cli: Some(cli),
        duration_ms: elapsed_ms(started),
        error,
    }
}

/// Collect drained stderr after the child has exited.
fn collect_stderr(stderr_rx: &Receiver<String>) -> String {
    stderr_rx
        .recv_timeout(STDERR_COLLECT_TIMEOUT)
        .unwrap_or_default()
}

/// Kill the child and build the timeout result, preserving any partial
/// result the stream processor had already captured.
fn finish_timed_out(
    child: &mut Child,
    processor: &StreamProcessor,
    cli: CliKind,
    timeout_ms: u64,
    started: Instant,
) -> ExecutionResult {
    let _ = child.kill();
    let _ = child.wait();

    let result_text = processor.result_text();
    let status = if result_text.is_some() {
        ExecStatus::Partial
    } else {
        ExecStatus::Error
    };

    ExecutionResult {
        result: result_text.unwrap_or_default(),
        exit_code: exit_codes::TIMEOUT,
        status,
        cli: Some(cli),
        duration_ms: elapsed_ms(started),
        error: Some(format!("Timeout after {}ms", timeout_ms)),
    }
}

/// Request cooperative termination of the child.
///
/// SIGTERM on unix so the CLI can flush and exit with 143; elsewhere the
/// platform kill is the only stop available.
#[cfg(unix)]
fn terminate_gracefully(child: &mut Child) {
    // SAFETY: plain syscall on a pid we own; failure (already exited) is fine.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(child: &mut Child) {
    let _ = child.kill();
}

/// Wait for the child to exit, polling until the deadline.
///
/// Returns `None` when the deadline passes first.
fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Option<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return None;
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            }
            // A wait error leaves no status to report; treat as deadline.
            Err(_) => return None,
        }
    }
}

/// Map an exit status to a single integer, shell-style.
///
/// Signal deaths map to `128 + signal` so SIGTERM reads as 143.
fn exit_status_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    exit_codes::USER_ERROR
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
