//! Recovers tool calls that a model wrote into its plain-text reply
//! instead of the native tool-call channel.
//!
//! Strategies run in order and the first hit wins: fence stripping,
//! whole-text parse, balanced-brace scan, then line scan. A candidate
//! object only counts when it names a registered tool.

use crate::tools::ToolRegistry;
use crate::types::{Arguments, ToolCall};
use serde_json::{Map, Value};
use tracing::debug;

/// Try to find a call to a registered tool in `text`.
pub fn extract_tool_call(text: &str, registry: &ToolRegistry) -> Option<ToolCall> {
    let body = strip_fence(text).unwrap_or(text).trim();
    if body.is_empty() {
        return None;
    }

    if let Some(call) = parse_candidate(body, registry) {
        debug!("Extracted tool call from whole text: {}", call.name);
        return Some(call);
    }

    for candidate in balanced_objects(body) {
        if let Some(call) = parse_candidate(candidate, registry) {
            debug!("Extracted tool call from embedded object: {}", call.name);
            return Some(call);
        }
    }

    for line in body.lines() {
        let line = line.trim();
        if line.starts_with('{') && line.ends_with('}') {
            if let Some(call) = parse_candidate(line, registry) {
                debug!("Extracted tool call from line: {}", call.name);
                return Some(call);
            }
        }
    }

    None
}

/// Inner content of the first complete triple-backtick fence. The language
/// tag on the opening fence (`json`, `tool_call`) is skipped.
fn strip_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let tag_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(after.len());
    let body = &after[tag_len..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Every outermost balanced `{...}` substring, left to right.
///
/// Quotes only open a string literal inside an object, so apostrophes in
/// surrounding prose do not derail the scan.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    found.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    found
}

fn parse_candidate(candidate: &str, registry: &ToolRegistry) -> Option<ToolCall> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(obj)) => call_from_object(&obj, registry),
        _ => None,
    }
}

fn call_from_object(obj: &Map<String, Value>, registry: &ToolRegistry) -> Option<ToolCall> {
    if let Some(name) = obj.get("name") {
        let name = name.as_str()?.trim();
        if !registry.contains(name) {
            debug!("Ignoring call to unregistered tool: {}", name);
            return None;
        }
        let raw = obj
            .get("arguments")
            .or_else(|| obj.get("params"))
            .or_else(|| obj.get("parameters"));
        return Some(ToolCall::from_raw(name, raw));
    }

    if let Some(Value::Object(inner)) = obj.get("function") {
        return call_from_object(inner, registry);
    }

    if let Some(Value::String(tool)) = obj.get("tool") {
        let tool = tool.trim();
        if registry.contains(tool) {
            let arguments: Arguments = obj
                .iter()
                .filter(|(key, _)| key.as_str() != "tool")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            return Some(ToolCall::new(tool, arguments));
        }
    }

    None
}
