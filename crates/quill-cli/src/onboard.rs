//! Onboard command — write a default config and workspace skeleton.

use anyhow::{Context, Result};
use colored::Colorize;

use quill_core::config::{get_config_path, load_config, save_config};

/// Workspace subdirectories created on onboarding.
const WORKSPACE_DIRS: &[&str] = &["state", "content", "sessions"];

pub fn run() -> Result<()> {
    crate::helpers::print_banner();

    let config_path = get_config_path();
    if config_path.exists() {
        println!("  Config already exists at {}", config_path.display());
    } else {
        let config = load_config(None); // defaults + any env credentials
        save_config(&config, None).context("failed to write config")?;
        println!("  {} {}", "Created".green(), config_path.display());
    }

    let config = load_config(None);
    let workspace = crate::helpers::expand_tilde(&config.agent.workspace);
    for dir in WORKSPACE_DIRS {
        let path = workspace.join(dir);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }
    println!("  {} workspace at {}", "Created".green(), workspace.display());

    println!();
    println!("  {}", "Next steps".bold());
    if !config.providers.anthropic.is_configured() {
        println!("  1. Set your API key: export ANTHROPIC_API_KEY=sk-ant-...");
    }
    if !config.channels.telegram.is_configured() {
        println!("  2. For Telegram, set channels.telegram.token in the config");
    }
    println!("  3. Try it: quill chat -m \"hello\"");
    println!();

    Ok(())
}
