//! Append-only JSONL transcript of a session.
//!
//! Logging is best-effort: a log that cannot be opened or written is
//! reported once at `warn` and then switched off. It never interrupts the
//! conversation.

use crate::types::{ChatRole, ToolCall, Turn};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Serialize)]
struct Entry<'a> {
    ts: DateTime<Utc>,
    role: ChatRole,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
    #[serde(skip_serializing_if = "no_calls")]
    tool_calls: &'a [ToolCall],
}

fn no_calls(calls: &&[ToolCall]) -> bool {
    calls.is_empty()
}

/// Handle to the current session's transcript file.
#[derive(Debug, Default)]
pub struct SessionLog {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl SessionLog {
    /// Open `<dir>/session_<YYYYmmdd_HHMMSS>.jsonl`, creating `dir` as needed.
    pub fn create(dir: &Path) -> Self {
        let name = format!("session_{}.jsonl", Local::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);

        let opened = std::fs::create_dir_all(dir).and_then(|_| {
            OpenOptions::new().create(true).append(true).open(&path)
        });
        match opened {
            Ok(file) => {
                debug!("Session log: {}", path.display());
                Self {
                    path: Some(path),
                    file: Some(file),
                }
            }
            Err(e) => {
                warn!("Session log disabled, cannot open {}: {}", path.display(), e);
                Self::disabled()
            }
        }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn record(&mut self, turn: &Turn) {
        let Some(file) = self.file.as_mut() else {
            return;
        };

        let entry = Entry {
            ts: Utc::now(),
            role: turn.role,
            content: &turn.content,
            tool_name: turn.tool_name.as_deref(),
            tool_calls: &turn.tool_calls,
        };

        let written = serde_json::to_string(&entry)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(file, "{line}"));

        if let Err(e) = written {
            warn!("Session log write failed, disabling: {}", e);
            self.file = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn writes_one_json_object_per_turn() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::create(&dir.path().join(".taiyo"));
        assert!(log.is_enabled());

        let args = json!({"command": "ls"});
        let call = ToolCall::new("bash", args.as_object().cloned().unwrap());
        log.record(&Turn::user("hi"));
        log.record(&Turn::assistant("", vec![call]));
        log.record(&Turn::tool_result("bash", "a.txt"));

        let path = log.path().unwrap().to_path_buf();
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("session_") && file_name.ends_with(".jsonl"));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["role"], "user");
        assert!(lines[0].get("tool_calls").is_none());
        assert_eq!(lines[1]["tool_calls"][0]["name"], "bash");
        assert_eq!(lines[2]["tool_name"], "bash");
        assert!(lines[2]["ts"].is_string());
    }

    #[test]
    fn disabled_log_is_a_no_op() {
        let mut log = SessionLog::disabled();
        log.record(&Turn::user("ignored"));
        assert!(!log.is_enabled());
        assert!(log.path().is_none());
    }

    #[test]
    fn unopenable_directory_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let log = SessionLog::create(&blocker.join("sub"));
        assert!(!log.is_enabled());
    }
}
