//! File reading with line numbers.

use super::args::{optional_u64, required_non_empty};
use super::traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};
use super::ToolContext;
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write as _;

/// Longest line returned before truncation.
const MAX_LINE_CHARS: usize = 2000;
const DEFAULT_LIMIT: u64 = 2000;

pub struct ReadTool {
    spec: ToolSpec,
    ctx: ToolContext,
}

impl ReadTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            spec: ToolSpec::new(
                "read",
                "Read the contents of a file. Returns file content with line numbers.",
                vec![
                    ParamSpec::required(
                        "file_path",
                        ParamKind::String,
                        "Absolute or relative path to the file to read",
                    ),
                    ParamSpec::optional(
                        "offset",
                        ParamKind::Integer,
                        "Line number to start reading from (1-based)",
                    )
                    .with_default(json!(1)),
                    ParamSpec::optional("limit", ParamKind::Integer, "Maximum number of lines to read")
                        .with_default(json!(DEFAULT_LIMIT)),
                ],
            ),
            ctx,
        }
    }

    async fn run(&self, args: &Arguments) -> Result<String, ToolError> {
        let raw_path = required_non_empty(args, "file_path")?;
        let offset = optional_u64(args, "offset", 1)?.max(1) as usize;
        let limit = optional_u64(args, "limit", DEFAULT_LIMIT)? as usize;

        let path = self.ctx.resolve_path(raw_path);
        if !path.exists() {
            return Err(ToolError::Failed(format!("File not found: {}", path.display())));
        }
        if path.is_dir() {
            return Err(ToolError::Failed(format!(
                "Path is a directory: {}",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(&path).await?;
        let content = String::from_utf8_lossy(&bytes);

        let mut out = String::new();
        for (idx, line) in content.lines().enumerate().skip(offset - 1).take(limit) {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = write!(out, "{:>6}\t{}", idx + 1, truncate_line(line));
        }
        Ok(out)
    }
}

fn truncate_line(line: &str) -> String {
    if line.chars().count() > MAX_LINE_CHARS {
        let cut: String = line.chars().take(MAX_LINE_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[async_trait]
impl Tool for ReadTool {
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
    use std::time::Duration;

    fn tool(dir: &std::path::Path) -> ReadTool {
        ReadTool::new(ToolContext::new(dir.to_path_buf(), Duration::from_secs(5)))
    }

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn numbers_lines_relative_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\nbeta\ngamma\n").unwrap();

        let result = tool(dir.path()).execute(&args(json!({"file_path": "a.txt"}))).await;
        assert!(!result.is_error, "{}", result.render());
        assert_eq!(result.output, "     1\talpha\n     2\tbeta\n     3\tgamma");
    }

    #[tokio::test]
    async fn honours_offset_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "1\n2\n3\n4\n5\n").unwrap();

        let result = tool(dir.path())
            .execute(&args(json!({"file_path": "a.txt", "offset": 2, "limit": 2})))
            .await;
        assert_eq!(result.output, "     2\t2\n     3\t3");
    }

    #[tokio::test]
    async fn missing_file_and_directory_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let t = tool(dir.path());

        let missing = t.execute(&args(json!({"file_path": "nope.txt"}))).await;
        assert!(missing.is_error);
        assert!(missing.error_message.starts_with("File not found:"));

        let is_dir = t.execute(&args(json!({"file_path": "."}))).await;
        assert!(is_dir.is_error);
        assert!(is_dir.error_message.starts_with("Path is a directory:"));
    }

    #[test]
    fn long_lines_are_truncated() {
        let line = "x".repeat(MAX_LINE_CHARS + 10);
        let out = truncate_line(&line);
        assert_eq!(out.len(), MAX_LINE_CHARS + 3);
        assert!(out.ends_with("..."));
    }
}
