//! Shared types used across the taiyo runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Loosely typed tool arguments, exactly as the model produced them.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Conversation turns
// ---------------------------------------------------------------------------

/// Speaker of a turn in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A normalized tool invocation, whether it arrived on the native
/// tool-call channel or was recovered from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from a raw arguments value of unknown shape.
    pub fn from_raw(name: impl Into<String>, raw: Option<&serde_json::Value>) -> Self {
        Self::new(name, normalize_arguments(raw))
    }
}

/// Coerce a raw arguments value into a mapping.
///
/// String-encoded JSON (the OpenAI convention) is decoded first. Anything
/// that is still not an object becomes an empty mapping.
pub fn normalize_arguments(raw: Option<&serde_json::Value>) -> Arguments {
    match raw {
        Some(serde_json::Value::Object(map)) => map.clone(),
        Some(serde_json::Value::String(s)) => {
            match serde_json::from_str::<serde_json::Value>(s) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => Arguments::new(),
            }
        }
        _ => Arguments::new(),
    }
}

/// One persisted entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    #[serde(default)]
    pub content: String,
    /// Calls requested by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Which tool produced a tool-result turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_name: None,
        }
    }

    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: Some(tool_name.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool results
// ---------------------------------------------------------------------------

/// Outcome of executing a tool. `is_error` selects which payload is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub output: String,
    pub error_message: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error_message: String::new(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error_message: message.into(),
            is_error: true,
        }
    }

    /// Text projection fed back to the model as a tool-result turn.
    pub fn render(&self) -> String {
        if self.is_error {
            format!("Error: {}", self.error_message)
        } else {
            self.output.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Agent loop events
// ---------------------------------------------------------------------------

/// Observable step of the orchestration loop, delivered to the presentation
/// layer in the same order the matching turns are appended.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Assistant text (a whole reply, or one fragment in streaming mode).
    Text { content: String },
    /// The model asked for a tool.
    ToolCall { name: String, arguments: Arguments },
    /// A tool finished (or was synthesized as unknown).
    ToolResult { name: String, result: ToolResult },
}

/// Summary of one user message worth of rounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// Request/response cycles issued for this user message.
    pub rounds: u32,
    /// The loop stopped because the round ceiling was hit.
    pub ceiling_reached: bool,
    /// Final assistant text, if the loop ended on a plain reply.
    pub final_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_results_render_with_prefix() {
        let result = ToolResult::error("Unknown tool: nope");
        assert_eq!(result.render(), "Error: Unknown tool: nope");
    }

    #[test]
    fn success_results_render_verbatim() {
        let result = ToolResult::success("  line one\nline two ");
        assert_eq!(result.render(), "  line one\nline two ");
    }

    #[test]
    fn normalize_arguments_decodes_string_json() {
        let raw = json!("{\"command\": \"ls\"}");
        let args = normalize_arguments(Some(&raw));
        assert_eq!(args.get("command"), Some(&json!("ls")));
    }

    #[test]
    fn normalize_arguments_falls_back_to_empty_map() {
        assert!(normalize_arguments(None).is_empty());
        assert!(normalize_arguments(Some(&json!([1, 2]))).is_empty());
        assert!(normalize_arguments(Some(&json!("not json"))).is_empty());
        assert!(normalize_arguments(Some(&json!(null))).is_empty());
    }

    #[test]
    fn turn_serializes_without_empty_optional_fields() {
        let value = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));

        let value = serde_json::to_value(Turn::tool_result("bash", "ok")).unwrap();
        assert_eq!(value["tool_name"], json!("bash"));
    }
}
