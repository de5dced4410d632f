//! The `ModelClient` trait — Quill's boundary to the LLM.

use async_trait::async_trait;
use quill_core::types::{Message, ModelResponse, ToolDefinition};

/// Per-client generation settings.
#[derive(Clone, Debug)]
pub struct RequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// A failed model call.
///
/// These are real errors, not responses: the orchestration loop aborts the
/// turn on the first one and surfaces a diagnostic to the user instead of
/// retrying (a retry could duplicate tool side effects from earlier rounds).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("model request failed: {0}")]
    Request(String),
    /// Non-success HTTP status from the provider.
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },
    /// Response body didn't match the expected shape.
    #[error("failed to parse model response: {0}")]
    Parse(String),
}

/// Stateless chat boundary: all context travels in `messages` every call.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one Messages-API call.
    ///
    /// `system` is the system prompt, `tools` the advertised catalog, and
    /// `messages` the full ordered conversation so far. The response either
    /// carries final text or one or more tool-use requests.
    async fn send(
        &self,
        system: &str,
        tools: &[ToolDefinition],
        messages: &[Message],
    ) -> Result<ModelResponse, ModelError>;

    /// Model identifier this client sends by default.
    fn default_model(&self) -> &str;

    /// Human-readable name for logging.
    fn display_name(&self) -> &str;
}
