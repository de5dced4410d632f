//! The `Channel` trait — what every chat transport implements.
//!
//! A channel listens for user messages (publishing them to the bus as
//! `InboundMessage`s) and delivers agent responses handed to it by the
//! `ChannelManager`, including any queued file attachments.

use async_trait::async_trait;
use quill_core::bus::OutboundMessage;

#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name; must match config keys and `OutboundMessage.channel`.
    fn name(&self) -> &str;

    /// Listen for incoming messages. Long-running; returns after `stop()`.
    async fn start(&self) -> anyhow::Result<()>;

    /// Graceful shutdown.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Deliver one outbound message (response text + attachments).
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingChannel {
        delivered: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Channel for CountingChannel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send(&self, _msg: &OutboundMessage) -> anyhow::Result<()> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch_works() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let channel: Arc<dyn Channel> = Arc::new(CountingChannel {
            delivered: delivered.clone(),
        });

        assert_eq!(channel.name(), "counting");
        channel
            .send(&OutboundMessage::new("counting", "c1", "hello"))
            .await
            .unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
