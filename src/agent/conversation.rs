//! Conversation state: the ordered turn log and its wire projection.

use crate::ollama::{ChatMessage, WireToolCall};
use crate::types::{ChatRole, ToolCall, Turn};
use tracing::debug;

/// Append-only log of turns for one session.
///
/// The system prompt is not stored here; it is prepended fresh every time
/// the payload is built so prompt changes apply immediately.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, content: impl Into<String>) -> &Turn {
        self.append(Turn::user(content))
    }

    pub fn append_assistant(&mut self, content: impl Into<String>, calls: Vec<ToolCall>) -> &Turn {
        self.append(Turn::assistant(content, calls))
    }

    pub fn append_tool_result(
        &mut self,
        tool_name: impl Into<String>,
        rendered: impl Into<String>,
    ) -> &Turn {
        self.append(Turn::tool_result(tool_name, rendered))
    }

    /// Append an already-built turn.
    pub fn append(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// Drop every turn.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Discard turns appended after a checkpoint taken with [`len`](Self::len).
    pub fn rollback(&mut self, checkpoint: usize) {
        if checkpoint < self.turns.len() {
            debug!(
                "Rolling back {} turn(s)",
                self.turns.len() - checkpoint
            );
            self.turns.truncate(checkpoint);
        }
    }

    /// Keep only the most recent `keep` turns. Tool results whose calling
    /// assistant turn fell off the front are dropped too. Returns how many
    /// turns were removed.
    pub fn compact(&mut self, keep: usize) -> usize {
        let before = self.turns.len();
        let start = before.saturating_sub(keep);
        let orphans = self.turns[start..]
            .iter()
            .take_while(|t| t.role == ChatRole::Tool)
            .count();
        self.turns.drain(..start + orphans);
        before - self.turns.len()
    }

    /// Messages for one chat request: a system message made of the static
    /// prompt plus the per-request preamble, then every turn in order.
    pub fn build_wire_payload(&self, system_prompt: &str, preamble: &str) -> Vec<ChatMessage> {
        let system = if preamble.is_empty() {
            system_prompt.to_string()
        } else {
            format!("{system_prompt}\n\n{preamble}")
        };

        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: system,
            tool_calls: Vec::new(),
        });
        messages.extend(self.turns.iter().map(|turn| ChatMessage {
            role: turn.role,
            content: turn.content.clone(),
            tool_calls: turn.tool_calls.iter().map(WireToolCall::from).collect(),
        }));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bash_call() -> ToolCall {
        let args = json!({"command": "ls"});
        ToolCall::new("bash", args.as_object().cloned().unwrap_or_default())
    }

    fn sample() -> Conversation {
        let mut conv = Conversation::new();
        conv.append_user("list files");
        conv.append_assistant("", vec![bash_call()]);
        conv.append_tool_result("bash", "a.txt");
        conv.append_assistant("There is one file.", vec![]);
        conv
    }

    #[test]
    fn payload_starts_with_system_and_keeps_order() {
        let conv = sample();
        let payload = conv.build_wire_payload("You are Taiyo.", "Working directory: /w");

        assert_eq!(payload.len(), 5);
        assert_eq!(payload[0].role, ChatRole::System);
        assert_eq!(payload[0].content, "You are Taiyo.\n\nWorking directory: /w");
        assert_eq!(payload[1].role, ChatRole::User);
        assert_eq!(payload[2].tool_calls.len(), 1);
        assert_eq!(payload[2].tool_calls[0].function.name, "bash");
        assert_eq!(payload[2].tool_calls[0].function.arguments, json!({"command": "ls"}));
        assert_eq!(payload[3].role, ChatRole::Tool);
        assert_eq!(payload[3].content, "a.txt");
        assert_eq!(payload[4].content, "There is one file.");
    }

    #[test]
    fn reset_leaves_only_system_message() {
        let mut conv = sample();
        conv.reset();
        let payload = conv.build_wire_payload("sys", "");
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[0].content, "sys");
    }

    #[test]
    fn tool_turn_serializes_without_tool_calls_field() {
        let conv = sample();
        let payload = conv.build_wire_payload("sys", "");
        let wire = serde_json::to_value(&payload[3]).unwrap();
        assert_eq!(wire, json!({"role": "tool", "content": "a.txt"}));
    }

    #[test]
    fn rollback_discards_later_turns() {
        let mut conv = sample();
        let checkpoint = 2;
        conv.rollback(checkpoint);
        assert_eq!(conv.len(), 2);
        conv.rollback(10);
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn compact_drops_orphaned_tool_results() {
        let mut conv = sample();
        conv.append_user("again");
        let removed = conv.compact(4);
        assert_eq!(removed, 1);
        assert_eq!(conv.turns()[0].role, ChatRole::Assistant);

        let mut conv = sample();
        conv.append_user("again");
        // Keeping 3 would start at the tool result of the first exchange.
        let removed = conv.compact(3);
        assert_eq!(removed, 3);
        assert_eq!(conv.turns()[0].content, "There is one file.");

        let mut conv = sample();
        let removed = conv.compact(2);
        assert_eq!(removed, 3);
        assert_eq!(conv.turns()[0].content, "There is one file.");
        assert_eq!(conv.turns().len(), 1);
    }

    #[test]
    fn append_returns_the_new_turn() {
        let mut conv = Conversation::new();
        let turn = conv.append_tool_result("read", "Error: File not found: x");
        assert_eq!(turn.tool_name.as_deref(), Some("read"));
        assert!(turn.tool_calls.is_empty());
    }
}
