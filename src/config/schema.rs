//! Configuration schema for config.toml.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Base instructions given to the model before the tool block.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Taiyo, an AI coding assistant running in the user's terminal.
You help with software engineering tasks: writing code, debugging, file management, and more.

When you need to perform actions, use the available tools. Be concise and helpful.
Explain briefly what you are doing before using a tool.
Read a file before editing it so you understand its context."#;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaiyoConfig {
    /// Base URL of the Ollama server.
    pub ollama_host: String,

    /// Model used for chat requests.
    pub model: String,

    /// Directory tools operate in and the context preamble reports.
    pub working_dir: PathBuf,

    /// `num_predict` sent with every chat request.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Ceiling on request/response cycles per user message.
    pub max_tool_rounds: u32,

    /// Timeout for a single model request, in seconds.
    pub request_timeout_secs: u64,

    /// Default timeout for bash commands, in seconds.
    pub bash_timeout_secs: u64,

    /// Session log directory, relative to the working directory unless absolute.
    pub session_dir: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Static system prompt.
    pub system_prompt: String,
}

impl Default for TaiyoConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://localhost:11434".into(),
            model: "qwen2.5-coder:7b".into(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            max_tokens: 4096,
            temperature: 0.1,
            max_tool_rounds: 15,
            request_timeout_secs: 300,
            bash_timeout_secs: 120,
            session_dir: ".taiyo".into(),
            log_level: "warn".into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

impl TaiyoConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).into_owned())
    }

    /// Directory session logs are written to.
    pub fn resolved_session_dir(&self) -> PathBuf {
        let dir = self.resolve_path(&self.session_dir);
        if dir.is_absolute() {
            dir
        } else {
            self.working_dir.join(dir)
        }
    }

    /// Switch the active model mid-session.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }
}
