//! Message bus — the queue pair connecting chat channels and the agent loop.
//!
//! Channels publish `InboundMessage`s; the agent loop consumes them, runs a
//! turn, and publishes `OutboundMessage`s, which the channel manager routes
//! back to the owning channel.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Media attached to an inbound message (photo, document).
#[derive(Clone, Debug, PartialEq)]
pub struct MediaAttachment {
    /// Local path the channel downloaded the media to.
    pub path: String,
    /// MIME type, best-effort.
    pub mime_type: String,
    pub filename: Option<String>,
}

/// A file queued for delivery to the user after the turn completes.
///
/// Populated by the `send_file` tool, drained exactly once by the delivery
/// layer. Turn-scoped: a fresh queue is created for every inbound message.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingAttachment {
    pub path: PathBuf,
    pub caption: String,
}

/// A user message arriving from a channel.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Channel name ("telegram", "cli", ...).
    pub channel: String,
    /// Sender identifier within the channel.
    pub sender_id: String,
    /// Chat/conversation identifier within the channel.
    pub chat_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub media: Vec<MediaAttachment>,
    /// Channel-specific extras (message id, username, ...).
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            media: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Key identifying the conversation in the log: `"channel:chat_id"`.
    pub fn conversation_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }
}

/// An agent response heading back to a channel.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
    /// Files to transmit after the text, in queue order.
    pub attachments: Vec<PendingAttachment>,
}

impl OutboundMessage {
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        OutboundMessage {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Bus
// ─────────────────────────────────────────────

/// Bounded mpsc pair: inbound (channels → agent) and outbound (agent → channels).
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Mutex<mpsc::Receiver<OutboundMessage>>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        MessageBus {
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: Mutex::new(outbound_rx),
        }
    }

    pub async fn publish_inbound(
        &self,
        msg: InboundMessage,
    ) -> Result<(), mpsc::error::SendError<InboundMessage>> {
        self.inbound_tx.send(msg).await
    }

    /// Next inbound message; `None` once all senders are gone.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        self.inbound_rx.lock().await.recv().await
    }

    pub async fn publish_outbound(
        &self,
        msg: OutboundMessage,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.outbound_tx.send(msg).await
    }

    /// Next outbound message; `None` once all senders are gone.
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        self.outbound_rx.lock().await.recv().await
    }

    /// Sender handle for channels to publish inbound messages.
    pub fn inbound_sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    /// Sender handle for the agent to publish outbound messages.
    pub fn outbound_sender(&self) -> mpsc::Sender<OutboundMessage> {
        self.outbound_tx.clone()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_key_format() {
        let msg = InboundMessage::new("telegram", "42|alice", "chat_99", "hi");
        assert_eq!(msg.conversation_key(), "telegram:chat_99");
    }

    #[tokio::test]
    async fn inbound_round_trip() {
        let bus = MessageBus::new(8);
        bus.publish_inbound(InboundMessage::new("cli", "user", "direct", "ping"))
            .await
            .unwrap();

        let got = bus.consume_inbound().await.unwrap();
        assert_eq!(got.channel, "cli");
        assert_eq!(got.content, "ping");
    }

    #[tokio::test]
    async fn outbound_carries_attachments() {
        let bus = MessageBus::new(8);
        let mut msg = OutboundMessage::new("telegram", "chat_1", "Here you go");
        msg.attachments.push(PendingAttachment {
            path: PathBuf::from("/ws/content/notes.md"),
            caption: "📄 notes.md".into(),
        });
        bus.publish_outbound(msg).await.unwrap();

        let got = bus.consume_outbound().await.unwrap();
        assert_eq!(got.attachments.len(), 1);
        assert_eq!(got.attachments[0].caption, "📄 notes.md");
    }

    #[tokio::test]
    async fn inbound_preserves_order() {
        let bus = MessageBus::new(8);
        for i in 0..3 {
            bus.publish_inbound(InboundMessage::new("cli", "u", "d", format!("m{i}")))
                .await
                .unwrap();
        }
        assert_eq!(bus.consume_inbound().await.unwrap().content, "m0");
        assert_eq!(bus.consume_inbound().await.unwrap().content, "m1");
        assert_eq!(bus.consume_inbound().await.unwrap().content, "m2");
    }

    #[tokio::test]
    async fn cloned_sender_reaches_bus() {
        let bus = MessageBus::new(8);
        let tx = bus.inbound_sender();
        tx.send(InboundMessage::new("telegram", "u", "c", "via clone"))
            .await
            .unwrap();
        assert_eq!(bus.consume_inbound().await.unwrap().content, "via clone");
    }
}
