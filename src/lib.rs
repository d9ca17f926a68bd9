//! Taiyo: a terminal coding agent for local Ollama models.
//!
//! The model answers in text or asks for tools; the agent runs the tools,
//! feeds the results back and repeats until the model stops asking or the
//! round ceiling is hit.

pub mod agent;
pub mod config;
pub mod git_ops;
pub mod ollama;
pub mod repl;
pub mod session;
pub mod setup;
pub mod tools;
pub mod types;
