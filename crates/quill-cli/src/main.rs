//! Quill CLI — entry point.
//!
//! # Commands
//!
//! - `quill chat [-m MESSAGE]` — talk to the assistant (single-shot or REPL)
//! - `quill gateway` — run the Telegram gateway + agent loop
//! - `quill status` — show configuration and readiness
//! - `quill onboard` — write a default config and workspace skeleton
//! - `quill fetch URL` — exercise the content fetcher directly

mod fetch_cmd;
mod gateway;
mod helpers;
mod onboard;
mod repl;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use quill_agent::AgentLoop;
use quill_core::bus::MessageBus;
use quill_core::config::{load_config, Config};
use quill_core::log::ConversationLog;
use quill_providers::{create_client, RequestConfig};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🪶 Quill — conversational workspace assistant
#[derive(Parser)]
#[command(name = "quill", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Start the gateway (channels + agent loop)
    Gateway {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and readiness
    Status,

    /// Write a default config and workspace skeleton
    Onboard,

    /// Fetch a URL through the content extractor
    Fetch {
        /// The URL to fetch
        url: String,

        /// Print the structured result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { message, logs } => {
            init_logging(logs);
            run_chat(message).await
        }
        Commands::Gateway { logs } => {
            init_logging(logs);
            gateway::run().await
        }
        Commands::Status => status::run(),
        Commands::Onboard => onboard::run(),
        Commands::Fetch { url, json } => {
            init_logging(false);
            fetch_cmd::run(&url, json).await
        }
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>) -> Result<()> {
    let config = load_config(None);
    let agent = build_agent(&config)?;

    match message {
        Some(text) => {
            info!("processing single message");
            let response = agent.process_direct(&text).await;
            helpers::print_response(&response);
        }
        None => repl::run(agent).await?,
    }
    Ok(())
}

/// Assemble an `AgentLoop` from loaded configuration.
pub fn build_agent(config: &Config) -> Result<AgentLoop> {
    let workspace = helpers::expand_tilde(&config.agent.workspace);
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;

    let request = RequestConfig {
        max_tokens: config.agent.max_tokens,
        temperature: config.agent.temperature,
    };
    let client = create_client(&config.agent.model, &config.providers, request)
        .map_err(|e| anyhow::anyhow!(e))?;

    let bus = Arc::new(MessageBus::new(100));
    let log = Arc::new(ConversationLog::new(None).context("failed to open conversation log")?);

    Ok(AgentLoop::new(
        bus,
        Arc::new(client),
        workspace,
        log,
        Some(config.agent.max_tool_iterations as usize),
        Some(config.agent.history_limit as usize),
        None,
    ))
}

/// Initialize tracing output.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("quill=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
