//! Typed configuration schema.
//!
//! JSON on disk uses camelCase keys; Rust fields are snake_case, bridged by
//! `#[serde(rename_all = "camelCase")]`. Every section defaults sensibly so
//! a partial (or missing) config file still yields a usable `Config`.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.quill/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub providers: ProvidersConfig,
    pub channels: ChannelsConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Agent behavior settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Workspace directory all file tools are rooted in.
    pub workspace: String,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Maximum tokens to generate per model call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Ceiling on model calls per turn before the loop gives up.
    pub max_tool_iterations: u32,
    /// How many logged messages to replay as context.
    pub history_limit: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: "~/.quill/workspace".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_iterations: 10,
            history_limit: 20,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Credentials for one model provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl ProviderConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider sections.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
}

// ─────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────

/// All channel sections.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Telegram channel settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(default)]
    pub token: String,
    /// Allowed user ids / usernames. Empty list = allow everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
