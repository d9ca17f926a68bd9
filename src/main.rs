//! Taiyo: a terminal coding agent for local Ollama models.
//!
//! Usage:
//!   taiyo                    Start the interactive REPL
//!   taiyo ask "<prompt>"     Answer one message and exit
//!   taiyo models             List installed models
//!   taiyo status             Show connectivity and configuration
//!   taiyo init               Write a default config and TAIYO.md

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use taiyo::agent::Agent;
use taiyo::config::{self, TaiyoConfig};
use taiyo::git_ops;
use taiyo::ollama::OllamaClient;
use taiyo::repl::{self, Repl};
use taiyo::session::SessionLog;
use taiyo::setup::{self, InitStep};
use taiyo::tools::{default_registry, ToolContext};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "taiyo")]
#[command(version)]
#[command(about = "Terminal coding agent for local Ollama models")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model to use (overrides config and TAIYO_MODEL).
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Ollama server address (overrides config and OLLAMA_HOST).
    #[arg(long, global = true)]
    host: Option<String>,

    /// Working directory for tools.
    #[arg(short = 'd', long, global = true)]
    cwd: Option<String>,

    /// Path to the config file.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (debug, info, warn, error). Defaults to the config value.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the interactive REPL (default).
    Chat {
        /// Disable colors and the spinner.
        #[arg(long)]
        plain: bool,
    },

    /// Answer a single message and exit.
    Ask {
        prompt: String,

        /// Stream a plain answer without tools.
        #[arg(long)]
        no_tools: bool,
    },

    /// List models installed on the server.
    Models,

    /// Show connectivity and configuration.
    Status,

    /// Write a default config file and a TAIYO.md template.
    Init,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
        .unwrap_or_else(config::default_config_path);
    let config = load(&cli, &config_path)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Chat { plain: false }) {
        Commands::Chat { plain } => cmd_chat(config, plain).await,
        Commands::Ask { prompt, no_tools } => cmd_ask(config, &prompt, no_tools).await,
        Commands::Models => cmd_models(&config).await,
        Commands::Status => cmd_status(&config).await,
        Commands::Init => cmd_init(&config, &config_path),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_chat(config: TaiyoConfig, plain: bool) -> Result<()> {
    if plain {
        colored::control::set_override(false);
    }
    let (agent, client) = bootstrap(config)?;
    Repl::new(agent, client, !plain).run().await
}

async fn cmd_ask(config: TaiyoConfig, prompt: &str, no_tools: bool) -> Result<()> {
    let (mut agent, client) = bootstrap(config)?;
    if !client.check_connection().await {
        bail!(
            "Cannot connect to Ollama at {}. Start it with `ollama serve`.",
            client.base_url()
        );
    }

    if no_tools {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let mut print_chunk = |chunk: &str| {
            print!("{chunk}");
            let _ = std::io::stdout().flush();
        };
        let result = agent.run_plain(prompt, &mut print_chunk, &cancel).await;
        watcher.abort();
        println!();
        result?;
        return Ok(());
    }

    let (result, _) = repl::run_message(&mut agent, prompt, false).await;
    repl::report(&result);
    result?;
    Ok(())
}

async fn cmd_models(config: &TaiyoConfig) -> Result<()> {
    let client = client_for(config);
    if !client.check_connection().await {
        bail!("Cannot connect to Ollama at {}", client.base_url());
    }

    let models = client.list_models().await;
    if models.is_empty() {
        println!("No models installed. Run: ollama pull {}", config.model);
        return Ok(());
    }
    for model in models {
        if model == config.model {
            println!("{} {}", model, "*".cyan().bold());
        } else {
            println!("{model}");
        }
    }
    Ok(())
}

async fn cmd_status(config: &TaiyoConfig) -> Result<()> {
    let client = client_for(config);
    let connected = client.check_connection().await;

    println!();
    println!("{}", "=== Taiyo Status ===".bold());
    println!();
    println!("  {}:    {}", "Host".bold(), config.ollama_host);
    println!(
        "  {}:  {}",
        "Server".bold(),
        if connected {
            "connected".green()
        } else {
            "unreachable".red()
        }
    );
    println!("  {}:   {}", "Model".bold(), config.model);
    println!("  {}:     {}", "Cwd".bold(), config.working_dir.display());
    println!(
        "  {}:  {}",
        "Branch".bold(),
        git_ops::current_branch(&config.working_dir).unwrap_or_else(|| "-".into())
    );
    println!();

    if !connected {
        bail!("Ollama is not reachable at {}", config.ollama_host);
    }
    Ok(())
}

fn cmd_init(config: &TaiyoConfig, config_path: &std::path::Path) -> Result<()> {
    let steps = [
        setup::write_default_config(config, config_path)?,
        setup::write_project_file(&config.working_dir)?,
    ];
    for step in &steps {
        match step {
            InitStep::Created(path) => println!("{} {}", "Created".green(), path.display()),
            InitStep::AlreadyExists(path) => {
                println!("{} {}", "Exists ".yellow(), path.display())
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Layer configuration: defaults, file, environment, then flags.
fn load(cli: &Cli, config_path: &std::path::Path) -> Result<TaiyoConfig> {
    let mut cfg = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());

    if let Some(host) = &cli.host {
        cfg.ollama_host = config::normalize_host(host);
    }
    if let Some(model) = &cli.model {
        cfg.set_model(model.as_str());
    }
    if let Some(cwd) = &cli.cwd {
        cfg.working_dir = cfg.resolve_path(cwd);
    }
    if !cfg.working_dir.is_dir() {
        bail!(
            "Working directory does not exist: {}",
            cfg.working_dir.display()
        );
    }
    Ok(cfg)
}

fn client_for(config: &TaiyoConfig) -> OllamaClient {
    OllamaClient::new(
        &config.ollama_host,
        Duration::from_secs(config.request_timeout_secs),
    )
}

/// Build the agent and the client it talks through.
fn bootstrap(config: TaiyoConfig) -> Result<(Agent, OllamaClient)> {
    let client = client_for(&config);
    let ctx = ToolContext::new(
        config.working_dir.clone(),
        Duration::from_secs(config.bash_timeout_secs),
    );
    let registry = default_registry(&ctx);
    let session = SessionLog::create(&config.resolved_session_dir());

    info!(
        "Starting with model {} in {}",
        config.model,
        config.working_dir.display()
    );
    let agent = Agent::new(config, Arc::new(client.clone()), registry).with_session(session);
    Ok((agent, client))
}
