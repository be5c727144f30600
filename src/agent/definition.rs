//! Agent definition files.
//!
//! An agent definition is a text file under the agents directory, named
//! `<agent>.md` or `<agent>.txt`, with optional YAML-style frontmatter
//! followed by free-form body text:
//!
//! ```text
//! ---
//! run-agent: codex
//! ---
//!
//! # Reviewer
//!
//! Reviews diffs for correctness and style.
//! ```
//!
//! The `run-agent` key is the definition's CLI preference; the body is used
//! verbatim as the system context for the dispatched agent. The first
//! non-heading body line doubles as the agent's short description in
//! listings.
//!
//! Agent names come from untrusted input, so lookups validate the name
//! against a conservative filename pattern before touching the filesystem
//! and re-verify after path resolution that the file is still inside the
//! agents directory.

use crate::error::{Result, SubagentError};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File extensions tried for definition lookups, in priority order.
const DEFINITION_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// Environment variable overriding the default agents directory.
const AGENTS_DIR_VAR: &str = "SUB_AGENTS_DIR";

/// Default agents directory name under the working directory.
const DEFAULT_AGENTS_DIRNAME: &str = ".agents";

/// Maximum length of an extracted description, in characters.
const DESCRIPTION_MAX_CHARS: usize = 100;

/// Filename-safe agent name pattern.
static AGENT_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").expect("Invalid agent name regex")
});

/// A loaded agent definition.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    /// The definition's CLI preference (`run-agent` frontmatter key),
    /// verbatim and unvalidated.
    pub run_agent: Option<String>,
    /// The body text, used as the system context for the agent.
    pub system_context: String,
    /// Short description extracted from the body.
    pub description: String,
}

/// One entry in an agent listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgentListing {
    pub name: String,
    pub description: String,
}

/// Validate an agent name against the filename-safe pattern.
///
/// Rejects empty names, names starting with a separator or dot, and any
/// character outside `[a-zA-Z0-9._-]` — in particular path separators.
pub fn validate_agent_name(name: &str) -> Result<()> {
    if AGENT_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(SubagentError::InvalidAgentName(name.to_string()))
    }
}

/// Determine the agents directory for an invocation.
///
/// Priority: explicit flag > `SUB_AGENTS_DIR` > `<cwd>/.agents` >
/// `./.agents`.
pub fn resolve_agents_dir(flag: Option<&Path>, cwd: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }

    if let Ok(dir) = std::env::var(AGENTS_DIR_VAR)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }

    if let Some(cwd) = cwd {
        return cwd.join(DEFAULT_AGENTS_DIRNAME);
    }

    // Listing mode without --cwd falls back to the process working directory.
    std::env::current_dir()
        .map(|d| d.join(DEFAULT_AGENTS_DIRNAME))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_AGENTS_DIRNAME))
}

/// Load an agent definition by name.
///
/// Tries `<name>.md` then `<name>.txt` under `agents_dir`. Fails with
/// [`SubagentError::InvalidAgentName`] before any file access when the name
/// is unsafe, and with [`SubagentError::AgentNotFound`] when no definition
/// exists under either extension.
pub fn load_agent(agents_dir: &Path, name: &str) -> Result<AgentDefinition> {
    validate_agent_name(name)?;

    let canonical_dir = agents_dir.canonicalize().ok();

    for ext in DEFINITION_EXTENSIONS {
        let candidate = agents_dir.join(format!("{name}.{ext}"));
        if !candidate.exists() {
            continue;
        }

        // Defense in depth: the name pattern already forbids separators, but
        // a symlinked definition could still point outside the directory.
        if let (Some(dir), Ok(resolved)) = (&canonical_dir, candidate.canonicalize())
            && !resolved.starts_with(dir)
        {
            return Err(SubagentError::InvalidAgentName(name.to_string()));
        }

        let content = std::fs::read_to_string(&candidate).map_err(|e| {
            SubagentError::UserError(format!(
                "failed to read agent definition '{}': {}",
                candidate.display(),
                e
            ))
        })?;

        let (frontmatter, body) = parse_frontmatter(&content);
        let body = body.trim().to_string();

        return Ok(AgentDefinition {
            run_agent: frontmatter.get("run-agent").cloned(),
            description: extract_description(&body),
            system_context: body,
        });
    }

    Err(SubagentError::AgentNotFound(name.to_string()))
}

/// List all agent definitions in a directory.
///
/// Entries are sorted by name; when both `<name>.md` and `<name>.txt`
/// exist, the `.md` definition wins. A missing directory yields an empty
/// list, and unreadable files degrade to an empty description rather than
/// failing the listing.
pub fn list_agents(agents_dir: &Path) -> Vec<AgentListing> {
    let mut agents: Vec<AgentListing> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for ext in DEFINITION_EXTENSIONS {
        let Ok(entries) = std::fs::read_dir(agents_dir) else {
            return agents;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if seen.iter().any(|s| s == name) {
                continue;
            }
            seen.push(name.to_string());

            let description = std::fs::read_to_string(&path)
                .map(|content| {
                    let (_, body) = parse_frontmatter(&content);
                    extract_description(body.trim())
                })
                .unwrap_or_default();

            agents.push(AgentListing {
                name: name.to_string(),
                description,
            });
        }
    }

    agents.sort_by(|a, b| a.name.cmp(&b.name));
    agents
}

/// Split content into frontmatter key-value pairs and the remaining body.
///
/// Frontmatter is a leading block delimited by `---` lines. Content without
/// such a block (or with one that fails to parse as a YAML mapping) is
/// treated as all body.
pub fn parse_frontmatter(content: &str) -> (BTreeMap<String, String>, &str) {
    let empty = BTreeMap::new();

    let Some(rest) = content.strip_prefix("---") else {
        return (empty, content);
    };
    // The opening delimiter must be a full line.
    let Some(newline) = rest.find('\n') else {
        return (empty, content);
    };
    if !rest[..newline].trim().is_empty() {
        return (empty, content);
    }
    let rest = &rest[newline + 1..];

    let Some(close) = rest.find("\n---") else {
        return (empty, content);
    };
    let yaml = &rest[..close];
    let after = &rest[close + 4..];
    // Skip the remainder of the closing delimiter line.
    let body = match after.find('\n') {
        Some(pos) if after[..pos].trim().is_empty() => &after[pos + 1..],
        None if after.trim().is_empty() => "",
        // Closing `---` has trailing junk: not a delimiter after all.
        _ => return (empty, content),
    };

    let Ok(mapping) = serde_yaml::from_str::<BTreeMap<String, serde_yaml::Value>>(yaml) else {
        return (empty, content);
    };

    let frontmatter = mapping
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect();

    (frontmatter, body)
}

/// Extract a short description: the first non-empty, non-heading body line,
/// truncated to 100 characters.
pub fn extract_description(body: &str) -> String {
    for line in body.lines() {
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            return line.chars().take(DESCRIPTION_MAX_CHARS).collect();
        }
    }
    String::new()
}
