pub mod client;
pub mod stream;

pub use client::{
    pick_model, ChatBackend, ChatMessage, ChatOptions, ChatRequest, ChatResponse, OllamaClient,
    TransportError, WireFunction, WireToolCall,
};
