//! Gateway command — channels + agent loop wired through the bus.
//!
//! Startup sequence:
//! 1. Load config, resolve the workspace
//! 2. Create the bus, model client, and conversation log
//! 3. Build the agent loop
//! 4. Register enabled channels
//! 5. Run agent loop + channel manager until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use quill_agent::AgentLoop;
use quill_channels::ChannelManager;
use quill_core::bus::MessageBus;
use quill_core::config::load_config;
use quill_core::log::ConversationLog;
use quill_providers::{create_client, RequestConfig};

use crate::helpers;

pub async fn run() -> Result<()> {
    helpers::print_banner();
    println!("  Mode: Gateway");
    println!();

    let config = load_config(None);

    let workspace = helpers::expand_tilde(&config.agent.workspace);
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;

    let bus = Arc::new(MessageBus::new(100));
    let log = Arc::new(ConversationLog::new(None).context("failed to open conversation log")?);

    let request = RequestConfig {
        max_tokens: config.agent.max_tokens,
        temperature: config.agent.temperature,
    };
    let client = create_client(&config.agent.model, &config.providers, request)
        .map_err(|e| anyhow::anyhow!(e))?;

    let agent = AgentLoop::new(
        bus.clone(),
        Arc::new(client),
        workspace.clone(),
        log.clone(),
        Some(config.agent.max_tool_iterations as usize),
        Some(config.agent.history_limit as usize),
        None,
    );

    #[allow(unused_mut)]
    let mut channel_manager = ChannelManager::new(bus.clone());

    #[cfg(feature = "telegram")]
    {
        let tg = &config.channels.telegram;
        if tg.is_configured() {
            use quill_channels::telegram::TelegramChannel;
            let telegram =
                TelegramChannel::new(tg.token.clone(), bus.clone(), tg.allowed_users.clone())
                    .with_conversation_log(log.clone());
            channel_manager.register(Arc::new(telegram));
            info!("registered telegram channel");
        }
    }

    info!(
        model = %config.agent.model,
        workspace = %workspace.display(),
        channels = ?channel_manager.channel_names(),
        "gateway starting"
    );

    println!("  Model:     {}", config.agent.model);
    println!("  Workspace: {}", workspace.display());
    println!("  Channels:  {} registered", channel_manager.len());
    println!();

    if channel_manager.is_empty() {
        println!("  ⚠  No channels registered. The agent loop will run but only");
        println!("     process messages from the internal bus. Configure Telegram");
        println!("     in ~/.quill/config.json (and build with --features telegram).");
        println!();
    }

    println!("  Ctrl+C to stop");
    println!();

    tokio::select! {
        _ = agent.run() => {
            info!("agent loop exited");
        }
        result = channel_manager.start_all() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "channel manager error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            channel_manager.stop_all().await;
        }
    }

    println!("  Gateway stopped. Goodbye!");
    Ok(())
}
