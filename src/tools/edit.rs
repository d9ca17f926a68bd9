//! Exact string replacement inside a file.

use super::args::{optional_bool, required_non_empty, required_str};
use super::traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};
use super::ToolContext;
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use similar::{ChangeTag, TextDiff};

pub struct EditTool {
    spec: ToolSpec,
    ctx: ToolContext,
}

impl EditTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            spec: ToolSpec::new(
                "edit",
                "Edit a file by replacing an exact string match with new content.",
                vec![
                    ParamSpec::required("file_path", ParamKind::String, "Path to the file to edit"),
                    ParamSpec::required(
                        "old_string",
                        ParamKind::String,
                        "The exact string to find and replace",
                    ),
                    ParamSpec::required("new_string", ParamKind::String, "The replacement string"),
                    ParamSpec::optional(
                        "replace_all",
                        ParamKind::Boolean,
                        "Replace all occurrences (default: false)",
                    )
                    .with_default(json!(false)),
                ],
            ),
            ctx,
        }
    }

    async fn run(&self, args: &Arguments) -> Result<String, ToolError> {
        let raw_path = required_non_empty(args, "file_path")?;
        let old_string = required_str(args, "old_string")?;
        let new_string = required_str(args, "new_string")?;
        let replace_all = optional_bool(args, "replace_all")?;

        if old_string.is_empty() {
            return Err(ToolError::MissingArgument("old_string"));
        }

        let path = self.ctx.resolve_path(raw_path);
        if !path.is_file() {
            return Err(ToolError::Failed(format!("File not found: {}", path.display())));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let updated = replace(&content, old_string, new_string, replace_all)?;
        tokio::fs::write(&path, &updated).await?;

        let (added, removed) = diff_summary(&content, &updated);
        Ok(format!(
            "File edited successfully: {} (+{added} -{removed})",
            path.display()
        ))
    }
}

fn replace(
    content: &str,
    old_string: &str,
    new_string: &str,
    replace_all: bool,
) -> Result<String, ToolError> {
    let count = content.matches(old_string).count();
    if count == 0 {
        let preview: String = old_string.chars().take(100).collect();
        return Err(ToolError::Failed(format!(
            "String not found in file: {preview:?}"
        )));
    }
    if count > 1 && !replace_all {
        return Err(ToolError::Failed(format!(
            "String found {count} times. Use replace_all=true or provide more context."
        )));
    }

    if replace_all {
        Ok(content.replace(old_string, new_string))
    } else {
        Ok(content.replacen(old_string, new_string, 1))
    }
}

/// Count of inserted and deleted lines between two versions.
fn diff_summary(before: &str, after: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(before, after);
    diff.iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        })
}

#[async_trait]
impl Tool for EditTool {
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

    fn tool(dir: &std::path::Path) -> EditTool {
        EditTool::new(ToolContext::new(dir.to_path_buf(), Duration::from_secs(5)))
    }

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn replaces_single_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.rs");
        std::fs::write(&file, "fn main() {\n    println!(\"hi\");\n}\n").unwrap();

        let result = tool(dir.path())
            .execute(&args(json!({
                "file_path": "main.rs",
                "old_string": "\"hi\"",
                "new_string": "\"hello\""
            })))
            .await;

        assert!(!result.is_error, "{}", result.render());
        assert!(result.output.ends_with("(+1 -1)"));
        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.contains("println!(\"hello\");"));
    }

    #[tokio::test]
    async fn ambiguous_match_requires_replace_all() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x\nx\n").unwrap();
        let t = tool(dir.path());

        let ambiguous = t
            .execute(&args(json!({"file_path": "a.txt", "old_string": "x", "new_string": "y"})))
            .await;
        assert!(ambiguous.is_error);
        assert!(ambiguous.error_message.starts_with("String found 2 times"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "x\nx\n");

        let all = t
            .execute(&args(json!({
                "file_path": "a.txt",
                "old_string": "x",
                "new_string": "y",
                "replace_all": true
            })))
            .await;
        assert!(!all.is_error, "{}", all.render());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "y\ny\n");
    }

    #[test]
    fn missing_string_is_reported() {
        let err = replace("abc", "zzz", "y", false).unwrap_err();
        assert_eq!(err.to_string(), "String not found in file: \"zzz\"");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path())
            .execute(&args(json!({"file_path": "none.txt", "old_string": "a", "new_string": "b"})))
            .await;
        assert!(result.is_error);
        assert!(result.error_message.starts_with("File not found:"));
    }
}
