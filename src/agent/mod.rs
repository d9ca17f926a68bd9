pub mod context;
pub mod conversation;
pub mod extractor;
pub mod injection_defense;
pub mod loop_;
pub mod system_prompt;

pub use context::ContextPreamble;
pub use conversation::Conversation;
pub use extractor::extract_tool_call;
pub use loop_::{Agent, AgentError};
