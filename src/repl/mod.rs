//! Interactive read-eval-print loop.
//!
//! Each message runs as two futures joined on the current task: the agent
//! turn, and a view that drains its events onto the terminal. A spawned
//! Ctrl+C watcher cancels the turn.

pub mod commands;
pub mod render;
pub mod spinner;

pub use commands::SlashCommand;

use crate::agent::{Agent, AgentError};
use crate::git_ops;
use crate::ollama::{pick_model, OllamaClient, TransportError};
use crate::setup::{self, InitStep};
use crate::types::{AgentEvent, TurnOutcome};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use render::{estimate_tokens, BannerInfo};
use spinner::Spinner;
use std::io::Write;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Turns kept by `/compact`.
const COMPACT_KEEP: usize = 4;

enum Input {
    Line(String),
    Interrupted,
    Eof,
}

pub struct Repl {
    agent: Agent,
    client: OllamaClient,
    animate: bool,
    tokens_up: usize,
    tokens_down: usize,
}

impl Repl {
    /// `animate` turns the spinner on; it is off in plain mode.
    pub fn new(agent: Agent, client: OllamaClient, animate: bool) -> Self {
        Self {
            agent,
            client,
            animate,
            tokens_up: 0,
            tokens_down: 0,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let working_dir = self.agent.config().working_dir.display().to_string();
        render::print_banner(&BannerInfo {
            version: env!("CARGO_PKG_VERSION"),
            working_dir: &working_dir,
            model: self.agent.model(),
            git_branch: self.agent.preamble().git_branch(),
        });

        connect(&mut self.agent, &self.client).await?;
        if let Some(path) = self.agent.session_path() {
            debug!("Session log at {}", path.display());
        }
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let input = match read_input(&mut lines).await? {
                Input::Line(input) => input,
                Input::Interrupted => {
                    println!("\n  {}", "(Ctrl+D or /quit to exit)".dimmed());
                    continue;
                }
                Input::Eof => {
                    println!("\n{}", "Goodbye!".dimmed());
                    break;
                }
            };

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            if let Some(command) = SlashCommand::parse(input) {
                if !self.handle_command(command).await? {
                    println!("{}", "Goodbye!".dimmed());
                    break;
                }
                continue;
            }

            self.tokens_up += estimate_tokens(input);
            println!();
            let (result, received) = run_message(&mut self.agent, input, self.animate).await;
            self.tokens_down += estimate_tokens(&received);
            report(&result);
        }

        Ok(())
    }

    /// Returns false when the REPL should exit.
    async fn handle_command(&mut self, command: SlashCommand) -> Result<bool> {
        match command {
            SlashCommand::Quit => return Ok(false),
            SlashCommand::Help => render::print_help(),
            SlashCommand::Clear => {
                self.agent.reset();
                self.tokens_up = 0;
                self.tokens_down = 0;
                println!("  {}\n", "Conversation history cleared.".dimmed());
            }
            SlashCommand::Compact => {
                let before = self.agent.conversation().len();
                if before > COMPACT_KEEP {
                    self.agent.compact(COMPACT_KEEP);
                    let after = self.agent.conversation().len();
                    println!(
                        "  {}\n",
                        format!("Compacted: {before} turns -> {after} turns.").dimmed()
                    );
                } else {
                    println!(
                        "  {}\n",
                        "Conversation is already short. Nothing to compact.".dimmed()
                    );
                }
            }
            SlashCommand::Model(Some(name)) => {
                self.agent.set_model(name.as_str());
                println!("  {} {}\n", "Model switched to:".dimmed(), name.bold());
            }
            SlashCommand::Model(None) => {
                let models = self.client.list_models().await;
                if models.is_empty() {
                    println!("  {}", "No models reported by the server.".yellow());
                } else {
                    println!("  {}", "Available models:".dimmed());
                    for model in &models {
                        let marker = if model == self.agent.model() {
                            " *".cyan().bold().to_string()
                        } else {
                            String::new()
                        };
                        println!("    {model}{marker}");
                    }
                }
                println!("\n  {}\n", "Usage: /model <name>".dimmed());
            }
            SlashCommand::Status => self.print_status(),
            SlashCommand::Init => {
                let step = setup::write_project_file(&self.agent.config().working_dir)?;
                match step {
                    InitStep::Created(path) => {
                        self.agent.reload_system_prompt();
                        println!("  {}\n", format!("Created {}", path.display()).green());
                    }
                    InitStep::AlreadyExists(path) => {
                        println!(
                            "  {}\n",
                            format!("{} already exists", path.display()).yellow()
                        );
                    }
                }
            }
            SlashCommand::Unknown(cmd) => {
                println!(
                    "  {}\n",
                    format!("Unknown command: {cmd}. Type /help for available commands.").red()
                );
            }
        }
        Ok(true)
    }

    fn print_status(&self) {
        let config = self.agent.config();
        println!("  {}", "--- Status ---".dimmed());
        println!("  {}   {}", "model:".dimmed(), config.model);
        println!("  {}    {}", "host:".dimmed(), config.ollama_host);
        println!("  {}     {}", "cwd:".dimmed(), config.working_dir.display());
        if let Some(branch) = git_ops::current_branch(&config.working_dir) {
            println!("  {}  {}", "branch:".dimmed(), branch);
        }
        println!(
            "  {}  {} ^ / {} v",
            "tokens:".dimmed(),
            self.tokens_up,
            self.tokens_down
        );
        println!(
            "  {} {} turns",
            "history:".dimmed(),
            self.agent.conversation().len()
        );
        if let Some(path) = self.agent.session_path() {
            println!("  {} {}", "session:".dimmed(), path.display());
        }
        println!();
    }
}

/// Verify the server is up and settle on a model it actually has.
pub async fn connect(agent: &mut Agent, client: &OllamaClient) -> Result<()> {
    if !client.check_connection().await {
        println!("  {}", "Cannot connect to Ollama!".red().bold());
        println!("  Start Ollama with: {}", "ollama serve".bold());
        println!(
            "  Then pull a model: {}",
            format!("ollama pull {}", agent.model()).bold()
        );
        bail!("Ollama is not reachable at {}", client.base_url());
    }

    let models = client.list_models().await;
    match pick_model(agent.model(), &models) {
        Some(model) if model != agent.model() => {
            println!("  {}", format!("Model auto-selected: {model}").yellow());
            agent.set_model(model);
        }
        Some(_) => {}
        None => println!(
            "  {}",
            format!("No models installed. Run: ollama pull {}", agent.model()).yellow()
        ),
    }

    println!(
        "  {}",
        format!("Connected to Ollama. Model: {}", agent.model()).dimmed()
    );
    info!("Connected to {} using {}", client.base_url(), agent.model());
    Ok(())
}

/// Read one logical input, joining lines that end with `\`.
async fn read_input(lines: &mut Lines<BufReader<Stdin>>) -> Result<Input> {
    let mut parts: Vec<String> = Vec::new();
    loop {
        let prompt = if parts.is_empty() {
            format!("{} {} ", "You".bright_blue().bold(), ">".bold())
        } else {
            format!("  {} ", "...".bold())
        };
        print!("{prompt}");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => return Ok(Input::Interrupted),
        };

        let Some(line) = line else {
            return Ok(if parts.is_empty() {
                Input::Eof
            } else {
                Input::Line(parts.join("\n"))
            });
        };

        match render::continuation(&line) {
            Some(head) => parts.push(head.to_string()),
            None => {
                parts.push(line);
                return Ok(Input::Line(parts.join("\n")));
            }
        }
    }
}

/// Run one message with live rendering. Returns the outcome and the
/// assistant text that was shown.
pub async fn run_message(
    agent: &mut Agent,
    input: &str,
    animate: bool,
) -> (Result<TurnOutcome, AgentError>, String) {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let run = async {
        let result = agent.run_turn(input, &tx, &cancel).await;
        // Closing the channel ends the view.
        drop(tx);
        result
    };

    let (result, received) = tokio::join!(run, show_events(rx, animate));
    watcher.abort();
    (result, received)
}

async fn show_events(mut rx: mpsc::UnboundedReceiver<AgentEvent>, animate: bool) -> String {
    let mut spinner = Spinner::start("Thinking...", animate);
    let mut tool_started = Instant::now();
    let mut received = String::new();

    while let Some(event) = rx.recv().await {
        spinner.stop();
        match event {
            AgentEvent::Text { content } => {
                println!("{} {}", "Taiyo >".bold(), content);
                println!();
                received.push_str(&content);
            }
            AgentEvent::ToolCall { name, arguments } => {
                render::print_tool_call(&name, &arguments);
                tool_started = Instant::now();
                spinner = Spinner::start(&format!("Running {name}..."), animate);
            }
            AgentEvent::ToolResult { name, result } => {
                render::print_tool_result(&name, &result, tool_started.elapsed().as_secs_f64());
                spinner = Spinner::start("Thinking...", animate);
            }
        }
    }

    spinner.stop();
    received
}

/// Print how a turn ended, when there is anything to say.
pub fn report(result: &Result<TurnOutcome, AgentError>) {
    match result {
        Ok(outcome) if outcome.ceiling_reached => println!(
            "  {}\n",
            format!(
                "Stopped after {} tool rounds. Send another message to continue.",
                outcome.rounds
            )
            .yellow()
        ),
        Ok(_) => {}
        Err(AgentError::Cancelled) => println!("\n  {}\n", "Cancelled.".dimmed().italic()),
        Err(AgentError::Transport(TransportError::Network(e))) if e.is_connect() => {
            println!("  {}\n", "Lost connection to Ollama!".red().bold())
        }
        Err(e) => println!("  {}\n", format!("Error: {e}").red().bold()),
    }
}
