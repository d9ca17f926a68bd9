//! Layered system prompt builder.
//!
//! Layers (in order):
//! 1. Static prompt from the configuration
//! 2. Tool catalogue and the JSON call convention
//! 3. Project instructions from `TAIYO.md`, sanitized

use crate::agent::injection_defense::sanitize_context;
use crate::tools::ToolRegistry;
use std::path::Path;
use tracing::{debug, warn};

/// Per-project instructions file, looked up in the working directory.
pub const PROJECT_FILE: &str = "TAIYO.md";

pub fn build_system_prompt(base_prompt: &str, registry: &ToolRegistry, working_dir: &Path) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(base_prompt.trim());

    if !registry.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&registry.describe_for_prompt());
    }

    if let Some(instructions) = load_project_instructions(working_dir) {
        prompt.push_str("\n\n# Project Instructions\n\n");
        prompt.push_str(&sanitize_context(PROJECT_FILE, &instructions));
    }

    debug!("System prompt: {} chars", prompt.len());
    prompt
}

/// Contents of `TAIYO.md`, if present and non-empty.
pub fn load_project_instructions(working_dir: &Path) -> Option<String> {
    let path = working_dir.join(PROJECT_FILE);
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}
