//! Status command — configuration and readiness at a glance.

use anyhow::Result;
use colored::Colorize;

use quill_core::config::{get_config_path, load_config};
use quill_core::log::ConversationLog;

pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    crate::helpers::print_banner();

    println!("  {}", "Configuration".bold());
    println!(
        "  Config file:  {} {}",
        config_path.display(),
        if config_path.exists() {
            "".normal()
        } else {
            "(not found, using defaults)".dimmed()
        }
    );
    println!("  Workspace:    {}", config.agent.workspace);
    println!("  Model:        {}", config.agent.model);
    println!("  Iterations:   {} per turn", config.agent.max_tool_iterations);
    println!();

    println!("  {}", "Readiness".bold());
    println!(
        "  Anthropic:    {}",
        if config.providers.anthropic.is_configured() {
            "configured".green()
        } else {
            "missing API key".red()
        }
    );
    println!(
        "  Telegram:     {}",
        if config.channels.telegram.is_configured() {
            "configured".green()
        } else {
            "no token (gateway disabled)".yellow()
        }
    );
    println!();

    if let Ok(log) = ConversationLog::new(None) {
        let conversations = log.list_conversations();
        println!("  {}", "Conversations".bold());
        if conversations.is_empty() {
            println!("  {}", "(none yet)".dimmed());
        } else {
            for id in conversations {
                println!("  • {id} ({} messages)", log.message_count(&id));
            }
        }
        println!();
    }

    Ok(())
}
