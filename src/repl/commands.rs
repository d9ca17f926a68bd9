//! Slash command parsing.

/// A `/command` typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Compact,
    /// `/model` lists models, `/model <name>` switches.
    Model(Option<String>),
    Status,
    Init,
    Quit,
    Unknown(String),
}

impl SlashCommand {
    /// `None` when the input is not a slash command at all.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }

        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        let command = match cmd.to_lowercase().as_str() {
            "/help" | "/?" => Self::Help,
            "/clear" => Self::Clear,
            "/compact" => Self::Compact,
            "/model" => Self::Model((!rest.is_empty()).then(|| rest.to_string())),
            "/status" => Self::Status,
            "/init" => Self::Init,
            "/quit" | "/exit" | "/q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}

pub const HELP: &[(&str, &str)] = &[
    ("/help", "Show this help"),
    ("/clear", "Clear conversation history"),
    ("/compact", "Keep only the most recent turns"),
    ("/model [name]", "List or switch models"),
    ("/status", "Show current status"),
    ("/init", "Create TAIYO.md in the working directory"),
    ("/quit", "Exit Taiyo"),
];
