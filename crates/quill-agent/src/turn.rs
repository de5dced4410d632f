//! Per-turn context — turn-scoped mutable state threaded through the loop
//! and the executor.
//!
//! A fresh `TurnContext` is built for every inbound message, so the pending
//! attachment queue is structurally empty at turn start regardless of how
//! the previous turn ended. Attachments are drained exactly once, at the end
//! of the turn, on every outcome.

use std::path::PathBuf;

use quill_core::bus::PendingAttachment;

/// State accumulated over one user turn.
#[derive(Debug)]
pub struct TurnContext {
    channel: String,
    chat_id: String,
    /// Human-readable log of significant actions (writes, fetches, queued
    /// deliveries), in execution order.
    actions: Vec<String>,
    /// Files queued by the `send_file` tool for delivery after the response.
    attachments: Vec<PendingAttachment>,
    progress_sent: bool,
}

impl TurnContext {
    /// Fresh context for a turn originating from `channel:chat_id`.
    pub fn new(channel: impl Into<String>, chat_id: impl Into<String>) -> Self {
        TurnContext {
            channel: channel.into(),
            chat_id: chat_id.into(),
            actions: Vec::new(),
            attachments: Vec::new(),
            progress_sent: false,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Note a significant action for the end-of-turn summary.
    pub fn record_action(&mut self, line: impl Into<String>) {
        self.actions.push(line.into());
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Queue a file for delivery after the turn completes.
    pub fn queue_attachment(&mut self, path: PathBuf, caption: String) {
        self.attachments.push(PendingAttachment { path, caption });
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Drain the attachment queue. Called once per turn by the delivery path.
    pub fn take_attachments(&mut self) -> Vec<PendingAttachment> {
        std::mem::take(&mut self.attachments)
    }

    /// True exactly once — the first time it is asked per turn. Gates the
    /// single "working" progress notification.
    pub fn should_send_progress(&mut self) -> bool {
        if self.progress_sent {
            false
        } else {
            self.progress_sent = true;
            true
        }
    }
}
