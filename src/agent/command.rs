//! Command construction for the supported agent CLIs.
//!
//! Each CLI has a fixed executable name and argument template that requests
//! machine-readable output and passes the prompt as a single trailing
//! argument. No shell is involved: the argument vector is passed to the
//! process spawner as-is.

use crate::agent::CliKind;

/// Environment variable holding an API key for `cursor-agent`.
///
/// When set and non-empty, the key is forwarded via `-a`.
const CURSOR_API_KEY_VAR: &str = "CLI_API_KEY";

/// An executable name plus argument vector, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The executable name (resolved via `PATH` at spawn time).
    pub program: &'static str,
    /// Arguments in invocation order.
    pub args: Vec<String>,
}

/// Build the command for invoking `cli` with the given prompt.
///
/// Pure function of its inputs apart from one optional environment lookup
/// for the cursor-agent API key.
pub fn build_command(cli: CliKind, prompt: &str) -> CommandSpec {
    match cli {
        CliKind::Codex => CommandSpec {
            program: "codex",
            args: vec![
                "exec".to_string(),
                "--json".to_string(),
                prompt.to_string(),
            ],
        },
        CliKind::Claude => CommandSpec {
            program: "claude",
            args: vec![
                "--output-format".to_string(),
                "stream-json".to_string(),
                "--verbose".to_string(),
                "-p".to_string(),
                prompt.to_string(),
            ],
        },
        CliKind::Gemini => CommandSpec {
            program: "gemini",
            args: vec![
                "--output-format".to_string(),
                "stream-json".to_string(),
                "-p".to_string(),
                prompt.to_string(),
            ],
        },
        CliKind::CursorAgent => {
            let mut args = vec![
                "--output-format".to_string(),
                "json".to_string(),
                "-p".to_string(),
                prompt.to_string(),
            ];
            if let Ok(api_key) = std::env::var(CURSOR_API_KEY_VAR)
                && !api_key.is_empty()
            {
                args.push("-a".to_string());
                args.push(api_key);
            }
            CommandSpec {
                program: "cursor-agent",
                args,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn codex_uses_exec_with_json_flag() {
        let spec = build_command(CliKind::Codex, "test prompt");
        assert_eq!(spec.program, "codex");
        assert_eq!(spec.args, ["exec", "--json", "test prompt"]);
    }

    #[test]
    fn claude_requests_streaming_json() {
        let spec = build_command(CliKind::Claude, "test prompt");
        assert_eq!(spec.program, "claude");
        assert_eq!(
            spec.args,
            ["--output-format", "stream-json", "--verbose", "-p", "test prompt"]
        );
    }

    #[test]
    fn gemini_requests_streaming_json() {
        let spec = build_command(CliKind::Gemini, "test prompt");
        assert_eq!(spec.program, "gemini");
        assert_eq!(
            spec.args,
            ["--output-format", "stream-json", "-p", "test prompt"]
        );
    }

    #[test]
    #[serial]
    fn cursor_requests_json() {
        unsafe {
            std::env::remove_var(CURSOR_API_KEY_VAR);
        }
        let spec = build_command(CliKind::CursorAgent, "test prompt");
        assert_eq!(spec.program, "cursor-agent");
        assert_eq!(spec.args, ["--output-format", "json", "-p", "test prompt"]);
    }

    #[test]
    #[serial]
    fn cursor_forwards_api_key_when_set() {
        unsafe {
            std::env::set_var(CURSOR_API_KEY_VAR, "test-key");
        }
        let spec = build_command(CliKind::CursorAgent, "test prompt");
        assert_eq!(
            spec.args,
            ["--output-format", "json", "-p", "test prompt", "-a", "test-key"]
        );
        unsafe {
            std::env::remove_var(CURSOR_API_KEY_VAR);
        }
    }

    #[test]
    #[serial]
    fn cursor_ignores_empty_api_key() {
        unsafe {
            std::env::set_var(CURSOR_API_KEY_VAR, "");
        }
        let spec = build_command(CliKind::CursorAgent, "test prompt");
        assert!(!spec.args.contains(&"-a".to_string()));
        unsafe {
            std::env::remove_var(CURSOR_API_KEY_VAR);
        }
    }

    #[test]
    fn prompt_is_a_single_trailing_argument() {
        let prompt = "do the thing; echo \"quoted\" && rm -rf /";
        for cli in [CliKind::Codex, CliKind::Claude, CliKind::Gemini] {
            let spec = build_command(cli, prompt);
            assert_eq!(spec.args.last().unwrap(), prompt);
        }
    }
}
