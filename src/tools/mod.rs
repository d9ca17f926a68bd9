pub mod args;
pub mod bash;
pub mod edit;
pub mod glob_tool;
pub mod grep;
pub mod read;
pub mod traits;
pub mod web_search;
pub mod write;

pub use traits::{ParamKind, ParamSpec, Tool, ToolError, ToolSpec};

use crate::types::{ToolCall, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Directory names the search tools never descend into.
const IGNORED_DIRS: &[&str] = &["node_modules", "__pycache__", "venv", "target"];

pub(crate) fn is_ignored_segment(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

/// Stop signal for blocking directory walks.
///
/// A tool future that is dropped mid-walk (the turn was cancelled) cannot
/// abort its `spawn_blocking` task, so the walk polls this flag instead.
#[derive(Debug, Clone, Default)]
pub(crate) struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub(crate) fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Guard that raises the flag when dropped.
    pub(crate) fn stop_on_drop(&self) -> StopOnDrop {
        StopOnDrop(self.clone())
    }
}

pub(crate) struct StopOnDrop(StopFlag);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Shared environment handed to the filesystem and shell tools.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub working_dir: PathBuf,
    pub bash_timeout: Duration,
}

impl ToolContext {
    pub fn new(working_dir: PathBuf, bash_timeout: Duration) -> Self {
        Self {
            working_dir,
            bash_timeout,
        }
    }

    /// Expand `~` and anchor relative paths at the working directory.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let expanded = shellexpand::tilde(raw);
        let path = Path::new(expanded.as_ref());
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        };
        // Drops `.` segments so `path: "."` reports clean paths.
        joined.components().collect()
    }
}

/// Name-keyed set of tools, kept in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A duplicate name replaces the earlier tool in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                debug!("Replacing tool registration: {}", name);
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| Arc::clone(&self.tools[slot]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list_specs(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn to_wire_schema(spec: &ToolSpec) -> Value {
        spec.to_wire()
    }

    /// All specs in function-calling form, for the request `tools` field.
    pub fn wire_schemas(&self) -> Vec<Value> {
        self.list_specs().into_iter().map(Self::to_wire_schema).collect()
    }

    /// Text block for the system prompt: every tool, its parameters, and the
    /// JSON convention for calling one from plain text.
    pub fn describe_for_prompt(&self) -> String {
        let mut out =
            String::from("Available tools (call by outputting JSON with 'name' and 'arguments'):\n");
        for spec in self.list_specs() {
            let params = spec
                .params
                .iter()
                .map(|p| {
                    let marker = if p.required { "" } else { ", optional" };
                    format!("{} ({}{}): {}", p.name, p.kind, marker, p.description)
                })
                .collect::<Vec<_>>()
                .join("; ");
            let _ = writeln!(out, "  - {}: {}", spec.name, spec.description);
            let _ = writeln!(out, "    Parameters: {params}");
        }
        out.push('\n');
        out.push_str("To call a tool, output ONLY a JSON object like:\n");
        out.push_str(r#"{"name": "tool_name", "arguments": {"param1": "value1"}}"#);
        out.push('\n');
        out.push_str("After receiving tool results, provide your response to the user.");
        out
    }

    /// Run a call. A name with no registration yields an error result,
    /// never a failure.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.lookup(&call.name) {
            Some(tool) => {
                let result = tool.execute(&call.arguments).await;
                if result.is_error {
                    warn!("Tool {} failed: {}", call.name, result.error_message);
                }
                result
            }
            None => {
                warn!("Model requested unknown tool: {}", call.name);
                ToolResult::error(format!("Unknown tool: {}", call.name))
            }
        }
    }
}

/// The built-in tool set, in the order the model sees it.
pub fn default_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(bash::BashTool::new(ctx.clone()));
    registry.register(read::ReadTool::new(ctx.clone()));
    registry.register(write::WriteTool::new(ctx.clone()));
    registry.register(edit::EditTool::new(ctx.clone()));
    registry.register(grep::GrepTool::new(ctx.clone()));
    registry.register(glob_tool::GlobTool::new(ctx.clone()));
    registry.register(web_search::WebSearchTool::new());
    registry
}
