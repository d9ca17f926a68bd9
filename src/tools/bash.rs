//! Shell command execution.

use super::args::{optional_u64, required_non_empty};
use super::traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};
use super::ToolContext;
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Commands that must never run from a model request.
const FORBIDDEN_PATTERNS: &[&str] = &[
    ":(){ :|:& };:",
    "mkfs",
    "dd if=",
    "> /dev/sd",
    "shutdown",
    "reboot",
    "halt -f",
];

/// `rm` targets that wipe the filesystem root or the home directory.
const PROTECTED_TARGETS: &[&str] = &[
    "/", "/*", "/.", "~", "~/", "~/*", "$home", "$home/", "$home/*", "${home}", "${home}/",
    "${home}/*",
];

/// Check if a command string matches a forbidden pattern.
fn is_forbidden(command: &str) -> bool {
    let lower = command.to_lowercase();
    FORBIDDEN_PATTERNS.iter().any(|pat| lower.contains(pat))
        || lower
            .split(|c| matches!(c, ';' | '&' | '|' | '\n' | '(' | ')' | '`'))
            .any(is_recursive_rm_of_root)
}

/// `rm` with a recursive flag and a protected target, wherever `rm` sits
/// in the segment (`sudo rm ...`, `xargs rm ...`).
fn is_recursive_rm_of_root(segment: &str) -> bool {
    let tokens: Vec<&str> = segment
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
        .collect();
    let Some(pos) = tokens.iter().position(|t| *t == "rm" || t.ends_with("/rm")) else {
        return false;
    };

    let mut recursive = false;
    let mut protected = false;
    for token in &tokens[pos + 1..] {
        if let Some(long) = token.strip_prefix("--") {
            recursive |= long == "recursive";
        } else if let Some(short) = token.strip_prefix('-') {
            recursive |= short.contains(['r', 'R']);
        } else {
            protected |= PROTECTED_TARGETS.contains(token);
        }
    }
    recursive && protected
}

pub struct BashTool {
    spec: ToolSpec,
    ctx: ToolContext,
}

impl BashTool {
    pub fn new(ctx: ToolContext) -> Self {
        let default_timeout = ctx.bash_timeout.as_secs();
        Self {
            spec: ToolSpec::new(
                "bash",
                "Execute a bash command and return its output. Use for git, build tools, and other system commands.",
                vec![
                    ParamSpec::required("command", ParamKind::String, "The bash command to execute"),
                    ParamSpec::optional(
                        "timeout",
                        ParamKind::Integer,
                        &format!("Timeout in seconds (default {default_timeout})"),
                    )
                    .with_default(json!(default_timeout)),
                ],
            ),
            ctx,
        }
    }

    async fn run(&self, args: &Arguments) -> Result<String, ToolError> {
        let command = required_non_empty(args, "command")?;
        let timeout_secs = optional_u64(args, "timeout", self.ctx.bash_timeout.as_secs())?;

        if is_forbidden(command) {
            return Err(ToolError::Failed(format!(
                "Command blocked by safety rules: {command}"
            )));
        }

        debug!("bash: {}", command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.ctx.working_dir)
            .env("TERM", "dumb")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(output) => output?,
            Err(_) => {
                warn!("bash command timed out after {}s", timeout_secs);
                return Err(ToolError::Failed(format!(
                    "Command timed out after {timeout_secs}s"
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut combined = stdout.trim_end().to_string();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }
        let combined = combined.trim().to_string();

        if output.status.success() {
            Ok(combined)
        } else {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".into());
            if combined.is_empty() {
                Err(ToolError::Failed(format!("Exit code: {code}")))
            } else {
                Err(ToolError::Failed(format!("Exit code: {code}\n{combined}")))
            }
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments) -> ToolResult {
        self.run(args).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    fn tool(dir: &std::path::Path) -> BashTool {
        BashTool::new(ToolContext::new(dir.to_path_buf(), Duration::from_secs(10)))
    }

    #[test]
    fn forbidden_patterns_match_only_destructive_commands() {
        assert!(is_forbidden("rm -rf /"));
        assert!(is_forbidden("echo hi; rm -rf /*"));
        assert!(is_forbidden("sudo mkfs.ext4 /dev/sda1"));
        assert!(!is_forbidden("rm -rf /tmp/build"));
        assert!(!is_forbidden("ls -la"));
        assert!(!is_forbidden("rm -rf $HOME/.cache/pip"));
    }

    #[test]
    fn recursive_rm_of_root_is_caught_in_any_spelling() {
        assert!(is_forbidden("sudo rm -rf /"));
        assert!(is_forbidden("rm -rf / --no-preserve-root"));
        assert!(is_forbidden("rm -fr /"));
        assert!(is_forbidden("rm -r -f ~"));
        assert!(is_forbidden("rm --recursive --force \"$HOME\""));
        assert!(is_forbidden("cd /tmp && /bin/rm -Rf /*"));

        assert!(!is_forbidden("rm -f /tmp/x.log"));
        assert!(!is_forbidden("rm -rf ./build ~/project/target"));
        assert!(!is_forbidden("grep -r rm /"));
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

        let result = tool(dir.path()).execute(&args(json!({"command": "ls"}))).await;
        assert!(!result.is_error, "{}", result.render());
        assert!(result.output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn combines_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path())
            .execute(&args(json!({"command": "echo out; echo err 1>&2"})))
            .await;
        assert_eq!(result.output, "out\nerr");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_with_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path())
            .execute(&args(json!({"command": "echo boom; exit 3"})))
            .await;
        assert!(result.is_error);
        assert_eq!(result.error_message, "Exit code: 3\nboom");
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path())
            .execute(&args(json!({"command": "sleep 5", "timeout": 1})))
            .await;
        assert!(result.is_error);
        assert_eq!(result.error_message, "Command timed out after 1s");
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path()).execute(&Arguments::new()).await;
        assert!(result.is_error);
        assert_eq!(result.render(), "Error: Missing 'command' argument");
    }
}
