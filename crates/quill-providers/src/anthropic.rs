//! Anthropic Messages API client.
//!
//! Direct `reqwest` calls against `POST {base}/v1/messages` with the
//! `x-api-key` / `anthropic-version` headers. Each outbound call carries a
//! hard timeout; a timed-out call surfaces as `ModelError::Request` like any
//! other transport failure.

use async_trait::async_trait;
use tracing::{debug, error};

use quill_core::config::schema::ProvidersConfig;
use quill_core::types::{Message, MessagesRequest, ModelResponse, ToolDefinition};
use quill_core::utils::truncate_string;

use crate::traits::{ModelClient, ModelError, RequestConfig};

/// Default API base.
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Hard per-call network timeout.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Error bodies are truncated to this many chars before surfacing.
const ERROR_BODY_LIMIT: usize = 400;

// ─────────────────────────────────────────────
// AnthropicClient
// ─────────────────────────────────────────────

/// HTTP client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    config: RequestConfig,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicClient {
    /// Create a client for the given key, base (default official), and model.
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        model: impl Into<String>,
        config: RequestConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        AnthropicClient {
            client,
            api_base: api_base.unwrap_or_else(|| ANTHROPIC_API_BASE.to_string()),
            api_key: api_key.into(),
            model: model.into(),
            config,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn send(
        &self,
        system: &str,
        tools: &[ToolDefinition],
        messages: &[Message],
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "calling model"
        );

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.config.max_tokens,
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: (!tools.is_empty()).then(|| tools.to_vec()),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "model HTTP request failed");
                ModelError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(unreadable error body)".to_string());
            error!(status = %status, body = %body, "model API error");
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: truncate_string(&body, ERROR_BODY_LIMIT),
            });
        }

        let parsed: ModelResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse model response");
            ModelError::Parse(e.to_string())
        })?;

        debug!(
            blocks = parsed.content.len(),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("?"),
            tool_requests = parsed.tool_requests().len(),
            "model response received"
        );
        Ok(parsed)
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        "Anthropic"
    }
}

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

/// Build a client from the providers section of the config.
///
/// Errors with a setup hint when no API key is configured.
pub fn create_client(
    model: &str,
    providers: &ProvidersConfig,
    config: RequestConfig,
) -> Result<AnthropicClient, String> {
    let anthropic = &providers.anthropic;
    if !anthropic.is_configured() {
        return Err(
            "No Anthropic API key configured. Set providers.anthropic.apiKey in the config \
             file or the ANTHROPIC_API_KEY environment variable."
                .to_string(),
        );
    }
    Ok(AnthropicClient::new(
        anthropic.api_key.clone(),
        anthropic.api_base.clone(),
        model,
        config,
    ))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
