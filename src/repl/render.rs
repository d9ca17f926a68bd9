//! Terminal rendering: banner, tool panels, token counts.

use crate::types::{Arguments, ToolResult};
use colored::Colorize;
use serde_json::Value;

/// Longest argument value shown in a tool-call panel.
pub const MAX_ARG_CHARS: usize = 200;
/// Longest tool output shown in a result panel, in lines.
pub const MAX_RESULT_LINES: usize = 30;
const PANEL_WIDTH: usize = 50;

/// Rough token count: about three characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        (text.chars().count() / 3).max(1)
    }
}

/// Cut `text` to `max` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// A line ending in `\` continues onto the next one.
pub fn continuation(line: &str) -> Option<&str> {
    line.strip_suffix('\\')
}

fn centered_rule(label: &str) -> String {
    let dashes = PANEL_WIDTH.saturating_sub(label.chars().count() + 4);
    let left = dashes / 2;
    format!("{}{label}{}", "─".repeat(left), "─".repeat(dashes - left))
}

fn closing_rule() -> String {
    "─".repeat(PANEL_WIDTH)
}

/// Plain-text body of a tool-call panel: one `key: value` line per argument.
pub fn tool_call_lines(arguments: &Arguments) -> Vec<String> {
    arguments
        .iter()
        .map(|(key, value)| {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{key}: {}", truncate_chars(&shown, MAX_ARG_CHARS))
        })
        .collect()
}

/// Plain-text body of a result panel, capped at [`MAX_RESULT_LINES`].
pub fn tool_result_lines(result: &ToolResult) -> Vec<String> {
    let rendered = result.render();
    let lines: Vec<&str> = rendered.lines().collect();
    let mut out: Vec<String> = lines
        .iter()
        .take(MAX_RESULT_LINES)
        .map(|l| l.to_string())
        .collect();
    if lines.len() > MAX_RESULT_LINES {
        out.push(format!("... {} more lines", lines.len() - MAX_RESULT_LINES));
    }
    out
}

pub fn print_tool_call(name: &str, arguments: &Arguments) {
    println!();
    println!("  {}", centered_rule(&format!(" {name} ")).yellow().bold());
    for line in tool_call_lines(arguments) {
        match line.split_once(": ") {
            Some((key, value)) => println!("  {} {}", format!("{key}:").dimmed(), value),
            None => println!("  {line}"),
        }
    }
    println!("  {}", closing_rule().yellow().bold());
}

pub fn print_tool_result(name: &str, result: &ToolResult, elapsed_secs: f64) {
    let status = if result.is_error { "Error" } else { "Result" };
    let header = centered_rule(&format!(" {name} {status} ({elapsed_secs:.1}s) "));
    let paint = |s: &str| {
        if result.is_error {
            s.red().bold()
        } else {
            s.dimmed()
        }
    };

    println!();
    println!("  {}", paint(&header));
    for line in tool_result_lines(result) {
        println!("  {}", line.dimmed());
    }
    println!("  {}", paint(&closing_rule()));
}

/// Facts shown in the startup box.
pub struct BannerInfo<'a> {
    pub version: &'a str,
    pub working_dir: &'a str,
    pub model: &'a str,
    pub git_branch: Option<&'a str>,
}

/// Rounded box lines, without color.
pub fn banner_lines(info: &BannerInfo<'_>) -> Vec<String> {
    let mut model_line = format!("model: {} (local)", info.model);
    if let Some(branch) = info.git_branch {
        model_line.push_str(&format!("  git: {branch}"));
    }
    let content = [
        format!("* Taiyo v{}", info.version),
        String::new(),
        "/help for help".to_string(),
        String::new(),
        format!("cwd: {}", info.working_dir),
        model_line,
    ];

    let inner = content
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(38)
        + 4;

    let mut lines = Vec::with_capacity(content.len() + 2);
    lines.push(format!("╭{}╮", "─".repeat(inner)));
    for line in &content {
        let pad = inner - 2 - line.chars().count();
        lines.push(format!("│ {line}{} │", " ".repeat(pad)));
    }
    lines.push(format!("╰{}╯", "─".repeat(inner)));
    lines
}

pub fn print_banner(info: &BannerInfo<'_>) {
    println!();
    for (i, line) in banner_lines(info).iter().enumerate() {
        if i == 1 {
            println!("{}", line.cyan().bold());
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();
}

pub fn print_help() {
    println!();
    println!("  {}", "Slash Commands".bold());
    println!("  {}", "─".repeat(33).dimmed());
    for (cmd, about) in super::commands::HELP {
        println!("  {}{}", format!("{cmd:<16}").bold(), about);
    }
    println!();
    println!("  {}", "Tips".bold());
    println!("  {}", "─".repeat(33).dimmed());
    println!("  {}", "End a line with \\ for multi-line input".dimmed());
    println!("  {}", "Ctrl+C cancels the current request".dimmed());
    println!("  {}", "Ctrl+D exits".dimmed());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_estimate() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("hi"), 1);
        assert_eq!(estimate_tokens("abcdefghi"), 3);
    }

    #[test]
    fn continuation_lines() {
        assert_eq!(continuation("first \\"), Some("first "));
        assert_eq!(continuation("done"), None);
    }

    #[test]
    fn long_arguments_are_truncated() {
        let args = json!({"command": "ls", "content": "x".repeat(250), "n": 3});
        let lines = tool_call_lines(args.as_object().unwrap());
        assert!(lines.contains(&"command: ls".to_string()));
        assert!(lines.contains(&"n: 3".to_string()));
        let content = lines.iter().find(|l| l.starts_with("content:")).unwrap();
        assert_eq!(content.len(), "content: ".len() + MAX_ARG_CHARS + 3);
    }

    #[test]
    fn results_are_capped() {
        let output = (1..=40).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let lines = tool_result_lines(&ToolResult::success(output));
        assert_eq!(lines.len(), MAX_RESULT_LINES + 1);
        assert_eq!(lines.last().unwrap(), "... 10 more lines");

        let err = tool_result_lines(&ToolResult::error("boom"));
        assert_eq!(err, vec!["Error: boom".to_string()]);
    }

    #[test]
    fn banner_box_is_rectangular() {
        let lines = banner_lines(&BannerInfo {
            version: "0.1.0",
            working_dir: "/home/me/project",
            model: "qwen2.5-coder:7b",
            git_branch: Some("main"),
        });
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(lines.iter().any(|l| l.contains("git: main")));
    }
}
