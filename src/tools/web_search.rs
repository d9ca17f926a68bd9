//! Web search stand-in. Taiyo runs fully local, so the tool only tells the
//! model that no search backend is available.

use super::args::optional_str;
use super::traits::{ParamKind, ParamSpec, Tool, ToolSpec};
use crate::types::{Arguments, ToolResult};
use async_trait::async_trait;

pub struct WebSearchTool {
    spec: ToolSpec,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec::new(
                "web_search",
                "Search the web for information. (Unavailable in local mode)",
                vec![ParamSpec::required("query", ParamKind::String, "Search query")],
            ),
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments) -> ToolResult {
        let query = optional_str(args, "query").unwrap_or_default();
        ToolResult::success(format!(
            "Web search is not available in local mode. Query: {query}"
        ))
    }
}
