//! Core message types — the Anthropic Messages API format, typed.
//!
//! Conversations are sequences of user/assistant messages whose content is
//! either plain text or a list of content blocks (text, image, tool-use,
//! tool-result). Tool-use blocks are only ever emitted by the model; the
//! orchestration layer answers each one with a tool-result block folded into
//! a synthetic user turn.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Roles and messages
// ─────────────────────────────────────────────

/// Message author role. The system prompt travels outside the message list,
/// so only two roles exist on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Message content — a plain string or a list of structured blocks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One block within a structured message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    /// A tool invocation requested by the model. Never constructed locally.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The textual answer to a prior tool-use block, correlated by id.
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

/// Base64 image payload for vision input.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    /// Build a base64-encoded image source.
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ImageSource {
            source_type: "base64".to_string(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

impl Message {
    /// Plain-text user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Plain-text assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Message from structured blocks (e.g. the model's raw tool-use turn).
    pub fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Message {
            role,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// The synthetic user turn carrying one round's tool results.
    ///
    /// Every `(tool_use_id, output)` pair becomes one tool-result block, so
    /// a round with N requests yields exactly N correlated results.
    pub fn tool_results(results: Vec<(String, String)>) -> Self {
        let blocks = results
            .into_iter()
            .map(|(tool_use_id, content)| ContentBlock::ToolResult {
                tool_use_id,
                content,
            })
            .collect();
        Message::blocks(Role::User, blocks)
    }
}

// ─────────────────────────────────────────────
// Tool catalog + requests
// ─────────────────────────────────────────────

/// A tool catalog entry as advertised to the model.
///
/// This is the negotiated contract the model formats its requests against;
/// names and required parameters must stay stable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool invocation extracted from a model response.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolRequest {
    /// Opaque correlation token; echoed back in the tool result.
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

// ─────────────────────────────────────────────
// Model responses
// ─────────────────────────────────────────────

/// Token usage reported by the provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// A parsed model response: content blocks plus stop metadata.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ModelResponse {
    /// Whether the response asks for at least one tool invocation.
    pub fn requests_tools(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Extract all tool requests, preserving order.
    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolRequest {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text blocks (the model's prose).
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        parts.join("\n")
    }
}

// ─────────────────────────────────────────────
// API request body
// ─────────────────────────────────────────────

/// Request body for the Messages endpoint.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
