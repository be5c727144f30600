//! CLI resolution for agent dispatch.
//!
//! This module decides which external agent CLI to invoke for a task.
//!
//! # Resolution Order
//!
//! 1. Explicit preference (CLI flag or the definition's `run-agent` key),
//!    if it names a supported CLI
//! 2. Caller detection: environment flags set by known calling agents,
//!    then a best-effort look at the parent process's command line
//! 3. The configured default
//!
//! Caller detection is advisory. It lives behind the [`CallerDetect`] trait
//! so that platforms without process introspection (or tests) can plug in
//! [`NoCallerDetect`] and fall through to the default.

use crate::error::SubagentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The supported external agent CLIs.
///
/// This is a closed set: adding a CLI means teaching `command` how to invoke
/// it and (if it speaks a new streaming protocol) `stream` how to read it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CliKind {
    /// Claude Code (`claude`).
    Claude,
    /// Cursor agent (`cursor-agent`).
    CursorAgent,
    /// OpenAI Codex (`codex`). The default when nothing else resolves.
    #[default]
    Codex,
    /// Google Gemini (`gemini`).
    Gemini,
}

impl CliKind {
    /// All supported CLIs, in display order.
    pub const ALL: [CliKind; 4] = [
        CliKind::Claude,
        CliKind::CursorAgent,
        CliKind::Codex,
        CliKind::Gemini,
    ];

    /// The CLI name as used on the command line and in definition files.
    pub fn as_str(&self) -> &'static str {
        match self {
            CliKind::Claude => "claude",
            CliKind::CursorAgent => "cursor-agent",
            CliKind::Codex => "codex",
            CliKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for CliKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CliKind {
    type Err = SubagentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(CliKind::Claude),
            "cursor-agent" => Ok(CliKind::CursorAgent),
            "codex" => Ok(CliKind::Codex),
            "gemini" => Ok(CliKind::Gemini),
            other => Err(SubagentError::UnsupportedCli(other.to_string())),
        }
    }
}

/// Capability interface for detecting which agent CLI invoked this process.
///
/// Detection must never fail an invocation: implementations return `None`
/// when nothing can be determined, and resolution falls through to the
/// default.
pub trait CallerDetect {
    /// Detect the calling CLI, if any.
    fn detect(&self) -> Option<CliKind>;
}

/// Caller detection that never detects anything.
///
/// Used in tests and on platforms without process introspection.
pub struct NoCallerDetect;

impl CallerDetect for NoCallerDetect {
    fn detect(&self) -> Option<CliKind> {
        None
    }
}

/// Environment flags set by known calling agents, checked in order.
const CALLER_ENV_FLAGS: [(&str, CliKind); 4] = [
    ("CLAUDE_CODE", CliKind::Claude),
    ("CURSOR_AGENT", CliKind::CursorAgent),
    ("CODEX_CLI", CliKind::Codex),
    ("GEMINI_CLI", CliKind::Gemini),
];

/// Best-effort caller detection from the process environment.
///
/// Checks the well-known environment flags first, then inspects the parent
/// process's command line on platforms that expose it via `/proc`.
pub struct EnvCallerDetect;

impl CallerDetect for EnvCallerDetect {
    fn detect(&self) -> Option<CliKind> {
        for (var, cli) in CALLER_ENV_FLAGS {
            if std::env::var(var).is_ok_and(|v| !v.is_empty()) {
                return Some(cli);
            }
        }

        detect_from_parent_cmdline()
    }
}

/// Inspect the parent process's command line for a known CLI name.
///
/// Unavailable outside Linux-style `/proc`; any read failure (sandboxed
/// environment, parent already gone) is swallowed as "no detection".
#[cfg(unix)]
fn detect_from_parent_cmdline() -> Option<CliKind> {
    let ppid = std::os::unix::process::parent_id();
    let cmdline = std::fs::read(format!("/proc/{}/cmdline", ppid)).ok()?;
    let cmdline = String::from_utf8_lossy(&cmdline).to_lowercase();

    if cmdline.contains("claude") {
        Some(CliKind::Claude)
    } else if cmdline.contains("cursor") {
        Some(CliKind::CursorAgent)
    } else if cmdline.contains("codex") {
        Some(CliKind::Codex)
    } else if cmdline.contains("gemini") {
        Some(CliKind::Gemini)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn detect_from_parent_cmdline() -> Option<CliKind> {
    None
}

/// Resolve which CLI to use for an invocation.
///
/// `preferred` is the definition's `run-agent` value (or an equivalent hint);
/// a value that does not name a supported CLI is ignored rather than
/// rejected, since definition files are user-edited free text.
pub fn resolve_cli(
    preferred: Option<&str>,
    detector: &dyn CallerDetect,
    default: CliKind,
) -> CliKind {
    if let Some(name) = preferred
        && let Ok(cli) = name.parse::<CliKind>()
    {
        return cli;
    }

    detector.detect().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct FixedDetect(Option<CliKind>);

    impl CallerDetect for FixedDetect {
        fn detect(&self) -> Option<CliKind> {
            self.0
        }
    }

    #[test]
    fn cli_kind_round_trips_through_strings() {
        for cli in CliKind::ALL {
            assert_eq!(cli.as_str().parse::<CliKind>().unwrap(), cli);
        }
    }

    #[test]
    fn unknown_cli_name_fails_to_parse() {
        let err = "copilot".parse::<CliKind>().unwrap_err();
        assert!(matches!(err, SubagentError::UnsupportedCli(_)));
        assert!(err.to_string().contains("copilot"));
    }

    #[test]
    fn cli_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&CliKind::CursorAgent).unwrap(),
            "\"cursor-agent\""
        );
        assert_eq!(serde_json::to_string(&CliKind::Claude).unwrap(), "\"claude\"");
    }

    #[test]
    fn resolve_prefers_valid_preference() {
        let cli = resolve_cli(
            Some("claude"),
            &FixedDetect(Some(CliKind::Gemini)),
            CliKind::Codex,
        );
        assert_eq!(cli, CliKind::Claude);
    }

    #[test]
    fn resolve_ignores_invalid_preference() {
        let cli = resolve_cli(Some("not-a-cli"), &NoCallerDetect, CliKind::Codex);
        assert_eq!(cli, CliKind::Codex);
    }

    #[test]
    fn resolve_falls_back_to_detection() {
        let cli = resolve_cli(None, &FixedDetect(Some(CliKind::Gemini)), CliKind::Codex);
        assert_eq!(cli, CliKind::Gemini);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let cli = resolve_cli(None, &NoCallerDetect, CliKind::Codex);
        assert_eq!(cli, CliKind::Codex);
    }

    #[test]
    #[serial]
    fn env_detect_reads_caller_flags() {
        // SAFETY: tests that touch the environment are serialized.
        unsafe {
            for (var, _) in CALLER_ENV_FLAGS {
                std::env::remove_var(var);
            }
            std::env::set_var("CODEX_CLI", "1");
        }

        assert_eq!(EnvCallerDetect.detect(), Some(CliKind::Codex));

        unsafe {
            std::env::remove_var("CODEX_CLI");
        }
    }

    #[test]
    #[serial]
    fn env_detect_ignores_empty_flags() {
        unsafe {
            for (var, _) in CALLER_ENV_FLAGS {
                std::env::remove_var(var);
            }
            std::env::set_var("CLAUDE_CODE", "");
        }

        // Empty flag must not trigger detection; parent-process inspection
        // may or may not find something depending on the test runner.
        let detected = EnvCallerDetect.detect();
        assert_ne!(detected, Some(CliKind::Claude));

        unsafe {
            std::env::remove_var("CLAUDE_CODE");
        }
    }
}
