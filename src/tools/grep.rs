//! Regex content search over a directory tree.

use super::args::{optional_bool, optional_str, required_non_empty};
use super::traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};
use super::{is_ignored_segment, StopFlag, ToolContext};
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::json;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MAX_MATCHES: usize = 200;

pub struct GrepTool {
    spec: ToolSpec,
    ctx: ToolContext,
}

impl GrepTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            spec: ToolSpec::new(
                "grep",
                "Search file contents using regex patterns. Returns matching lines with file paths and line numbers.",
                vec![
                    ParamSpec::required("pattern", ParamKind::String, "Regex pattern to search for"),
                    ParamSpec::optional(
                        "path",
                        ParamKind::String,
                        "Directory or file to search in (default: current dir)",
                    ),
                    ParamSpec::optional(
                        "glob",
                        ParamKind::String,
                        "File glob pattern to filter (e.g. '*.py', '*.rs')",
                    ),
                    ParamSpec::optional("case_insensitive", ParamKind::Boolean, "Case insensitive search")
                        .with_default(json!(false)),
                ],
            ),
            ctx,
        }
    }

    async fn run(&self, args: &Arguments) -> Result<String, ToolError> {
        let pattern = required_non_empty(args, "pattern")?;
        let root = self.ctx.resolve_path(optional_str(args, "path").unwrap_or("."));
        let case_insensitive = optional_bool(args, "case_insensitive")?;

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| ToolError::Failed(format!("Invalid regex: {e}")))?;

        let filter = optional_str(args, "glob")
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| ToolError::Failed(format!("Invalid glob: {e}")))?;

        if !root.exists() {
            return Err(ToolError::Failed(format!("Path not found: {}", root.display())));
        }

        // Directory walks block; keep them off the runtime threads.
        let stop = StopFlag::default();
        let _guard = stop.stop_on_drop();
        let (matches, truncated) =
            tokio::task::spawn_blocking(move || search(&root, &regex, filter.as_ref(), &stop))
                .await
                .map_err(|e| ToolError::Failed(format!("Search aborted: {e}")))?;

        if matches.is_empty() {
            return Ok("No matches found.".into());
        }
        let mut out = matches.join("\n");
        if truncated {
            out.push_str(&format!(
                "\n... stopped after {MAX_MATCHES} matches; narrow the pattern or path"
            ));
        }
        Ok(out)
    }
}

/// Returns up to [`MAX_MATCHES`] hits and whether more were found. The walk
/// ends early on the first hit past the cap or when `stop` is raised.
fn search(
    root: &Path,
    regex: &Regex,
    filter: Option<&glob::Pattern>,
    stop: &StopFlag,
) -> (Vec<String>, bool) {
    let files: Box<dyn Iterator<Item = PathBuf> + '_> = if root.is_file() {
        Box::new(std::iter::once(root.to_path_buf()))
    } else {
        Box::new(
            WalkDir::new(root)
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0 || !is_ignored_segment(&e.file_name().to_string_lossy())
                })
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter(move |e| match filter {
                    Some(pat) => {
                        let rel = e.path().strip_prefix(root).unwrap_or(e.path());
                        pat.matches(&e.file_name().to_string_lossy()) || pat.matches_path(rel)
                    }
                    None => true,
                })
                .map(|e| e.into_path()),
        )
    };

    let mut hits = Vec::new();
    for file in files {
        if stop.is_stopped() {
            break;
        }
        let Ok(bytes) = std::fs::read(&file) else {
            continue;
        };
        // Skip binaries.
        if bytes.contains(&0) {
            continue;
        }
        let text = String::from_utf8_lossy(&bytes);
        for (idx, line) in text.lines().enumerate() {
            if regex.is_match(line) {
                if hits.len() == MAX_MATCHES {
                    return (hits, true);
                }
                hits.push(format!("{}:{}: {}", file.display(), idx + 1, line.trim_end()));
            }
        }
    }
    (hits, false)
}

#[async_trait]
impl Tool for GrepTool {
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

    fn tool(dir: &Path) -> GrepTool {
        GrepTool::new(ToolContext::new(dir.to_path_buf(), Duration::from_secs(5)))
    }

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn hello() {}\nfn other() {}\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "Hello notes\n").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "hello()\n").unwrap();
        std::fs::write(dir.path().join(".git/config"), "hello\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn finds_matches_and_skips_ignored_dirs() {
        let dir = fixture();
        let result = tool(dir.path()).execute(&args(json!({"pattern": "hello"}))).await;

        assert!(!result.is_error, "{}", result.render());
        assert_eq!(result.output.lines().count(), 1);
        assert!(result.output.contains("lib.rs:1: pub fn hello() {}"));
    }

    #[tokio::test]
    async fn case_insensitive_and_glob_filter() {
        let dir = fixture();
        let t = tool(dir.path());

        let all = t
            .execute(&args(json!({"pattern": "hello", "case_insensitive": true})))
            .await;
        assert_eq!(all.output.lines().count(), 2);

        let md_only = t
            .execute(&args(json!({"pattern": "hello", "case_insensitive": true, "glob": "*.md"})))
            .await;
        assert_eq!(md_only.output.lines().count(), 1);
        assert!(md_only.output.contains("notes.md:1: Hello notes"));
    }

    #[tokio::test]
    async fn empty_and_invalid_searches() {
        let dir = fixture();
        let t = tool(dir.path());

        let none = t.execute(&args(json!({"pattern": "zzz_absent"}))).await;
        assert_eq!(none.output, "No matches found.");

        let bad = t.execute(&args(json!({"pattern": "("}))).await;
        assert!(bad.is_error);
        assert!(bad.error_message.starts_with("Invalid regex:"));
    }

    #[test]
    fn search_stops_past_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let body = "needle\n".repeat(MAX_MATCHES + 50);
        std::fs::write(dir.path().join("a.txt"), &body).unwrap();
        std::fs::write(dir.path().join("b.txt"), &body).unwrap();
        let regex = Regex::new("needle").unwrap();

        let (hits, truncated) = search(dir.path(), &regex, None, &StopFlag::default());
        assert_eq!(hits.len(), MAX_MATCHES);
        assert!(truncated);

        let stopped = StopFlag::default();
        stopped.stop();
        let (hits, truncated) = search(dir.path(), &regex, None, &stopped);
        assert!(hits.is_empty());
        assert!(!truncated);
    }

    #[tokio::test]
    async fn truncated_output_says_so() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "needle\n".repeat(MAX_MATCHES + 1)).unwrap();

        let result = tool(dir.path()).execute(&args(json!({"pattern": "needle"}))).await;
        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines.len(), MAX_MATCHES + 1);
        assert!(lines[MAX_MATCHES].starts_with("... stopped after 200 matches"));
    }
}
