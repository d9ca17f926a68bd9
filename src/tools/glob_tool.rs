//! File-name pattern matching.

use super::args::{optional_str, required_non_empty};
use super::traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};
use super::{is_ignored_segment, StopFlag, ToolContext};
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const MAX_FILES: usize = 500;

/// `*` stays inside one path segment; `**` crosses them.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub struct GlobTool {
    spec: ToolSpec,
    ctx: ToolContext,
}

impl GlobTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            spec: ToolSpec::new(
                "glob",
                "Find files matching a glob pattern (e.g. '**/*.py', 'src/**/*.ts').",
                vec![
                    ParamSpec::required(
                        "pattern",
                        ParamKind::String,
                        "Glob pattern to match files (e.g. '**/*.py')",
                    ),
                    ParamSpec::optional(
                        "path",
                        ParamKind::String,
                        "Base directory to search from (default: current dir)",
                    ),
                ],
            ),
            ctx,
        }
    }

    async fn run(&self, args: &Arguments) -> Result<String, ToolError> {
        let pattern = required_non_empty(args, "pattern")?;
        let base = self.ctx.resolve_path(optional_str(args, "path").unwrap_or("."));
        let (root, rest) = split_literal_prefix(&base, pattern);
        let matcher =
            Pattern::new(&rest).map_err(|e| ToolError::Failed(format!("Invalid glob: {e}")))?;

        let stop = StopFlag::default();
        let _guard = stop.stop_on_drop();
        let mut files = tokio::task::spawn_blocking(move || walk(&root, &matcher, &stop))
            .await
            .map_err(|e| ToolError::Failed(format!("Search aborted: {e}")))?;
        files.sort();

        if files.is_empty() {
            return Ok("No files found matching pattern.".into());
        }

        let mut out = files
            .iter()
            .take(MAX_FILES)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        if files.len() > MAX_FILES {
            out.push_str(&format!("\n... and {} more files", files.len() - MAX_FILES));
        }
        Ok(out)
    }
}

fn has_glob_chars(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

/// Split `pattern` into the directory to walk and the glob to match below
/// it. Leading segments without metacharacters become part of the walk
/// root and are never parsed as pattern syntax; the last segment always
/// stays in the glob.
fn split_literal_prefix(base: &Path, pattern: &str) -> (PathBuf, String) {
    let components: Vec<Component<'_>> = Path::new(pattern).components().collect();
    let mut root = base.to_path_buf();
    let mut split = 0;
    for (idx, component) in components.iter().enumerate() {
        if idx + 1 == components.len() {
            break;
        }
        let literal = match component {
            Component::Normal(seg) => !has_glob_chars(&seg.to_string_lossy()),
            _ => true,
        };
        if !literal {
            break;
        }
        root.push(component.as_os_str());
        split = idx + 1;
    }

    let rest = components[split..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    (root, rest)
}

/// Files under `root` whose path relative to `root` matches. Hidden and
/// ignored directories below `root` are pruned, not entered.
fn walk(root: &Path, matcher: &Pattern, stop: &StopFlag) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let entries = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored_segment(&e.file_name().to_string_lossy()));
    for entry in entries {
        if stop.is_stopped() {
            break;
        }
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if matcher.matches_path_with(rel, MATCH_OPTIONS) {
            files.push(entry.into_path());
        }
    }
    files
}

#[async_trait]
impl Tool for GlobTool {
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
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn lists_sorted_files_skipping_hidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::create_dir_all(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join("src/b.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/nested/a.rs"), "").unwrap();
        std::fs::write(dir.path().join(".cache/c.rs"), "").unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();

        let tool = GlobTool::new(ToolContext::new(dir.path().to_path_buf(), Duration::from_secs(5)));
        let args = json!({"pattern": "**/*.rs"});
        let result = tool.execute(args.as_object().unwrap()).await;

        assert!(!result.is_error, "{}", result.render());
        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("src/b.rs"));
        assert!(lines[1].ends_with("src/nested/a.rs"));
    }

    #[tokio::test]
    async fn no_match_message() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GlobTool::new(ToolContext::new(dir.path().to_path_buf(), Duration::from_secs(5)));
        let args = json!({"pattern": "*.zig"});
        let result = tool.execute(args.as_object().unwrap()).await;
        assert_eq!(result.output, "No files found matching pattern.");
    }

    #[tokio::test]
    async fn metacharacters_in_base_dir_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("proj[1]");
        std::fs::create_dir_all(project.join("src")).unwrap();
        std::fs::write(project.join("main.rs"), "").unwrap();
        std::fs::write(project.join("src/lib.rs"), "").unwrap();

        let tool = GlobTool::new(ToolContext::new(project.clone(), Duration::from_secs(5)));

        let top = tool.execute(json!({"pattern": "*.rs"}).as_object().unwrap()).await;
        assert!(!top.is_error, "{}", top.render());
        assert_eq!(top.output, project.join("main.rs").display().to_string());

        let nested = tool
            .execute(json!({"pattern": "src/*.rs"}).as_object().unwrap())
            .await;
        assert_eq!(nested.output, project.join("src/lib.rs").display().to_string());
    }

    #[test]
    fn literal_prefix_moves_into_walk_root() {
        let base = Path::new("/work");
        assert_eq!(
            split_literal_prefix(base, "src/**/*.ts"),
            (PathBuf::from("/work/src"), "**/*.ts".to_string())
        );
        assert_eq!(
            split_literal_prefix(base, "**/*.py"),
            (PathBuf::from("/work"), "**/*.py".to_string())
        );
        assert_eq!(
            split_literal_prefix(base, "/tmp/x/*.rs"),
            (PathBuf::from("/tmp/x"), "*.rs".to_string())
        );
    }

    #[test]
    fn walk_prunes_ignored_dirs_and_honours_stop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        std::fs::write(dir.path().join("target/debug/out.rs"), "").unwrap();
        std::fs::write(dir.path().join("keep.rs"), "").unwrap();
        let matcher = Pattern::new("**/*.rs").unwrap();

        let found = walk(dir.path(), &matcher, &StopFlag::default());
        assert_eq!(found, vec![dir.path().join("keep.rs")]);

        let stopped = StopFlag::default();
        stopped.stop();
        assert!(walk(dir.path(), &matcher, &stopped).is_empty());
    }
}
