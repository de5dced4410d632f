//! Context builder — system prompt and message assembly.
//!
//! The system prompt travels outside the message list. Messages are the
//! replayed history plus the fresh user message; photos become base64 image
//! blocks so the model can see them.

use std::path::PathBuf;

use quill_core::types::{ContentBlock, ImageSource, Message, Role};
use quill_core::utils::{today_date, truncate_string};
use tracing::debug;

/// Workspace files injected into the system prompt when present.
const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "USER.md"];

/// Per-file cap on injected bootstrap content.
const BOOTSTRAP_CHAR_LIMIT: usize = 4_000;

// ─────────────────────────────────────────────
// ContextBuilder
// ─────────────────────────────────────────────

/// Builds the system prompt and the message list for each model call.
pub struct ContextBuilder {
    workspace: PathBuf,
    assistant_name: String,
}

impl ContextBuilder {
    pub fn new(workspace: impl Into<PathBuf>, assistant_name: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            assistant_name: assistant_name.into(),
        }
    }

    // ────────────── system prompt ──────────────

    /// Full system prompt, including the current-session trailer.
    pub fn build_system_prompt(&self, channel: &str, chat_id: &str) -> String {
        let mut parts = vec![self.identity()];

        for filename in BOOTSTRAP_FILES {
            let path = self.workspace.join(filename);
            if path.is_file() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    debug!(file = filename, "loaded bootstrap file");
                    parts.push(format!(
                        "## {filename}\n\n{}",
                        truncate_string(content.trim(), BOOTSTRAP_CHAR_LIMIT)
                    ));
                }
            }
        }

        parts.push(format!(
            "## Current Session\nChannel: {channel}\nChat ID: {chat_id}"
        ));

        parts.join("\n\n---\n\n")
    }

    fn identity(&self) -> String {
        format!(
            "You are **{name}**, an AI assistant reachable through chat.\n\n\
             **Today's date**: {today}\n\n\
             ## Capabilities\n\
             - Read, write, and append to files in your workspace\n\
             - Search the workspace by file name or content\n\
             - List directories\n\
             - Fetch content from links (YouTube transcripts, Reddit posts, articles)\n\
             - Send workspace files to the user as attachments\n\n\
             ## Style\n\
             - Keep responses concise and mobile-friendly\n\
             - Prefer bullet points and short paragraphs\n\
             - When the user shares a link, fetch it and work from the content\n\
             - Offer to save valuable content into the workspace\n\n\
             ## Workspace\n\
             Rooted at `{workspace}`. Conventional locations:\n\
             - `state/` — current state and goals\n\
             - `content/` — notes, drafts, saved material\n\
             - `sessions/` — daily session logs",
            name = self.assistant_name,
            today = today_date(),
            workspace = self.workspace.display(),
        )
    }

    // ────────────── message assembly ──────────────

    /// History plus the fresh user message. Media paths become base64 image
    /// blocks alongside the text.
    pub fn build_messages(
        &self,
        history: &[Message],
        user_text: &str,
        media: &[String],
    ) -> Vec<Message> {
        let mut messages: Vec<Message> = history.to_vec();
        if media.is_empty() {
            messages.push(Message::user(user_text));
        } else {
            messages.push(image_message(user_text, media));
        }
        messages
    }
}

// ─────────────────────────────────────────────
// Image helpers
// ─────────────────────────────────────────────

/// User message carrying images plus the caption text.
fn image_message(text: &str, media_paths: &[String]) -> Message {
    let mut blocks = Vec::new();
    for path in media_paths {
        if let Ok(data) = std::fs::read(path) {
            blocks.push(ContentBlock::Image {
                source: ImageSource::base64(guess_media_type(path), base64_encode(&data)),
            });
        }
    }
    blocks.push(ContentBlock::Text {
        text: text.to_string(),
    });
    Message::blocks(Role::User, blocks)
}

/// Extension-based MIME guess; chat photos default to JPEG.
fn guess_media_type(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Standard-alphabet base64, small enough to not warrant a dependency.
fn base64_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = Vec::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(ALPHABET[((triple >> 18) & 0x3F) as usize]);
        out.push(ALPHABET[((triple >> 12) & 0x3F) as usize]);
        out.push(if chunk.len() > 1 {
            ALPHABET[((triple >> 6) & 0x3F) as usize]
        } else {
            b'='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(triple & 0x3F) as usize]
        } else {
            b'='
        });
    }
    String::from_utf8(out).unwrap_or_default()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
