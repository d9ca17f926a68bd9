//! Tool-calling orchestration loop: Ask → (Act → Observe)* → Answer.
//!
//! For every user message the agent:
//! 1. Appends the user turn
//! 2. Sends the whole conversation with the tool schemas attached
//! 3. Takes native tool calls, or extracts one from the reply text
//! 4. Executes each call in order and appends its result
//! 5. Repeats until the model answers in plain text or the round ceiling
//!    is reached

use crate::agent::context::ContextPreamble;
use crate::agent::conversation::Conversation;
use crate::agent::extractor::extract_tool_call;
use crate::agent::system_prompt::build_system_prompt;
use crate::config::TaiyoConfig;
use crate::ollama::{ChatBackend, ChatOptions, ChatRequest, TransportError};
use crate::session::SessionLog;
use crate::tools::ToolRegistry;
use crate::types::{AgentEvent, ToolCall, Turn, TurnOutcome};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a user message did not run to completion.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The user interrupted the turn. The conversation was rolled back to
    /// the start of the interrupted round.
    #[error("turn cancelled")]
    Cancelled,
}

/// A conversation with one model and one tool set.
pub struct Agent {
    config: TaiyoConfig,
    backend: Arc<dyn ChatBackend>,
    registry: ToolRegistry,
    conversation: Conversation,
    system_prompt: String,
    preamble: ContextPreamble,
    session: SessionLog,
}

impl Agent {
    pub fn new(config: TaiyoConfig, backend: Arc<dyn ChatBackend>, registry: ToolRegistry) -> Self {
        let system_prompt =
            build_system_prompt(&config.system_prompt, &registry, &config.working_dir);
        let preamble = ContextPreamble::capture(&config.working_dir);
        Self {
            config,
            backend,
            registry,
            conversation: Conversation::new(),
            system_prompt,
            preamble,
            session: SessionLog::disabled(),
        }
    }

    pub fn with_session(mut self, session: SessionLog) -> Self {
        self.session = session;
        self
    }

    pub fn config(&self) -> &TaiyoConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn preamble(&self) -> &ContextPreamble {
        &self.preamble
    }

    pub fn session_path(&self) -> Option<&Path> {
        self.session.path()
    }

    /// Switch models for all following requests. History is kept.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.set_model(model);
        info!("Model set to {}", self.config.model);
    }

    /// Forget the conversation; only the system prompt remains.
    pub fn reset(&mut self) {
        self.conversation.reset();
        info!("Conversation cleared");
    }

    /// Keep only the last `keep` turns.
    pub fn compact(&mut self, keep: usize) -> usize {
        let removed = self.conversation.compact(keep);
        info!("Compacted conversation: {} turn(s) removed", removed);
        removed
    }

    /// Rebuild the system prompt, e.g. after `TAIYO.md` was created.
    pub fn reload_system_prompt(&mut self) {
        self.system_prompt = build_system_prompt(
            &self.config.system_prompt,
            &self.registry,
            &self.config.working_dir,
        );
    }

    fn append(&mut self, turn: Turn) {
        self.session.record(&turn);
        self.conversation.append(turn);
    }

    fn request(&self, with_tools: bool) -> ChatRequest {
        let messages = self
            .conversation
            .build_wire_payload(&self.system_prompt, &self.preamble.render());
        let tools = if with_tools && !self.registry.is_empty() {
            Some(self.registry.wire_schemas())
        } else {
            None
        };
        ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: false,
            tools,
            options: ChatOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        }
    }

    /// Run one user message through the loop.
    ///
    /// Events are sent on `events` in the order the matching turns are
    /// appended; a closed receiver is ignored. When `cancel` fires, the
    /// in-flight request or tool is dropped and the conversation is rolled
    /// back to the start of the current round.
    pub async fn run_turn(
        &mut self,
        input: &str,
        events: &UnboundedSender<AgentEvent>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        self.append(Turn::user(input));

        let ceiling = self.config.max_tool_rounds.max(1);
        let mut outcome = TurnOutcome::default();

        loop {
            if outcome.rounds >= ceiling {
                warn!("Tool round ceiling reached ({})", ceiling);
                outcome.ceiling_reached = true;
                break;
            }

            let checkpoint = self.conversation.len();
            outcome.rounds += 1;

            let request = self.request(true);
            debug!(
                "[Round {}] Sending {} messages",
                outcome.rounds,
                request.messages.len()
            );

            let backend = Arc::clone(&self.backend);
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                response = backend.chat(&request) => Some(response),
            };
            let response = match response {
                Some(response) => response?,
                None => return Err(self.cancelled(checkpoint)),
            };

            let content = response.content().to_string();
            let mut calls = response.native_tool_calls();
            if calls.is_empty() {
                calls.extend(extract_tool_call(&content, &self.registry));
            }

            if calls.is_empty() {
                if content.is_empty() {
                    debug!("[Round {}] Empty reply", outcome.rounds);
                } else {
                    let _ = events.send(AgentEvent::Text {
                        content: content.clone(),
                    });
                }
                self.append(Turn::assistant(content.clone(), Vec::new()));
                outcome.final_text = (!content.is_empty()).then_some(content);
                break;
            }

            info!(
                "[Round {}] {} tool call(s): {}",
                outcome.rounds,
                calls.len(),
                calls
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            self.append(Turn::assistant(content, calls.clone()));

            for call in calls {
                if !self.execute_call(call, events, cancel).await {
                    return Err(self.cancelled(checkpoint));
                }
            }
        }

        Ok(outcome)
    }

    /// Execute one call and append its result. Returns false when the
    /// execution was cancelled.
    async fn execute_call(
        &mut self,
        call: ToolCall,
        events: &UnboundedSender<AgentEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        let _ = events.send(AgentEvent::ToolCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.registry.execute(&call) => Some(result),
        };
        let Some(result) = result else {
            return false;
        };

        let rendered = result.render();
        debug!(
            "Tool {} returned {} chars (error: {})",
            call.name,
            rendered.len(),
            result.is_error
        );

        let _ = events.send(AgentEvent::ToolResult {
            name: call.name.clone(),
            result,
        });
        self.append(Turn::tool_result(&call.name, rendered));

        if call.name == "bash" {
            self.preamble.refresh_branch();
        }
        true
    }

    fn cancelled(&mut self, checkpoint: usize) -> AgentError {
        warn!("Turn cancelled, rolling back to turn {}", checkpoint);
        self.conversation.rollback(checkpoint);
        AgentError::Cancelled
    }

    /// Answer one message without tools, streaming text to `on_chunk`.
    pub async fn run_plain(
        &mut self,
        input: &str,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        self.append(Turn::user(input));
        let checkpoint = self.conversation.len();

        let request = self.request(false);
        let backend = Arc::clone(&self.backend);
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            text = backend.chat_stream(&request, on_chunk) => Some(text),
        };
        let text = match text {
            Some(text) => text?,
            None => return Err(self.cancelled(checkpoint)),
        };

        self.append(Turn::assistant(text.clone(), Vec::new()));
        Ok(text)
    }
}
