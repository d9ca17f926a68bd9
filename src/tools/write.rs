//! File creation / overwrite.

use super::args::{required_non_empty, required_str};
use super::traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};
use super::ToolContext;
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;

pub struct WriteTool {
    spec: ToolSpec,
    ctx: ToolContext,
}

impl WriteTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            spec: ToolSpec::new(
                "write",
                "Write content to a file. Creates the file if it doesn't exist, overwrites it if it does.",
                vec![
                    ParamSpec::required(
                        "file_path",
                        ParamKind::String,
                        "Absolute or relative path to the file to write",
                    ),
                    ParamSpec::required("content", ParamKind::String, "The content to write to the file"),
                ],
            ),
            ctx,
        }
    }

    async fn run(&self, args: &Arguments) -> Result<String, ToolError> {
        let raw_path = required_non_empty(args, "file_path")?;
        let content = required_str(args, "content")?;

        let path = self.ctx.resolve_path(raw_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        Ok(format!(
            "File written successfully: {} ({} lines)",
            path.display(),
            count_lines(content)
        ))
    }
}

/// Line count where a missing trailing newline still counts the last line.
fn count_lines(content: &str) -> usize {
    let newlines = content.matches('\n').count();
    if !content.is_empty() && !content.ends_with('\n') {
        newlines + 1
    } else {
        newlines
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments) -> ToolResult {
        self.run(args).await.into()
    }
}
