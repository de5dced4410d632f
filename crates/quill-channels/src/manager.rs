//! Channel manager — lifecycle and outbound routing.
//!
//! Registered channels are started concurrently; a dispatcher task drains
//! the bus's outbound queue and hands each message to the channel named in
//! it. Unknown channel names are logged and dropped, never fatal.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use quill_core::bus::MessageBus;

use crate::base::Channel;

pub struct ChannelManager {
    channels: HashMap<String, Arc<dyn Channel>>,
    bus: Arc<MessageBus>,
    shutdown: Arc<Notify>,
}

impl ChannelManager {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self {
            channels: HashMap::new(),
            bus,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Register a channel under its own name. Last registration wins.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        info!(channel = channel.name(), "registered channel");
        self.channels.insert(channel.name().to_string(), channel);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Channel>> {
        self.channels.get(name)
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Start every channel plus the outbound dispatcher; blocks until
    /// shutdown is signaled.
    pub async fn start_all(&self) -> Result<()> {
        if self.channels.is_empty() {
            warn!("no channels registered, nothing to start");
            return Ok(());
        }

        info!(channels = ?self.channel_names(), "starting channels");

        for (name, channel) in &self.channels {
            let channel = channel.clone();
            let name = name.clone();
            tokio::spawn(async move {
                if let Err(e) = channel.start().await {
                    error!(channel = %name, error = %e, "channel start failed");
                }
                info!(channel = %name, "channel stopped");
            });
        }

        let bus = self.bus.clone();
        let channels = self.channels.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            Self::dispatch_outbound(bus, channels, shutdown).await;
        });

        self.shutdown.notified().await;
        info!("channel manager shutting down");
        Ok(())
    }

    /// Stop the dispatcher and every channel.
    pub async fn stop_all(&self) {
        self.shutdown.notify_waiters();
        for (name, channel) in &self.channels {
            debug!(channel = %name, "stopping channel");
            if let Err(e) = channel.stop().await {
                error!(channel = %name, error = %e, "channel stop failed");
            }
        }
        info!("all channels stopped");
    }

    /// Route agent responses from the bus to the owning channel.
    async fn dispatch_outbound(
        bus: Arc<MessageBus>,
        channels: HashMap<String, Arc<dyn Channel>>,
        shutdown: Arc<Notify>,
    ) {
        info!("outbound dispatcher started");
        loop {
            tokio::select! {
                msg = bus.consume_outbound() => {
                    let Some(msg) = msg else {
                        info!("outbound bus closed, dispatcher exiting");
                        break;
                    };
                    debug!(
                        channel = %msg.channel,
                        chat_id = %msg.chat_id,
                        attachments = msg.attachments.len(),
                        "dispatching outbound message"
                    );
                    match channels.get(&msg.channel) {
                        Some(channel) => {
                            if let Err(e) = channel.send(&msg).await {
                                error!(channel = %msg.channel, error = %e, "outbound send failed");
                            }
                        }
                        None => {
                            warn!(channel = %msg.channel, "no channel registered for message");
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("dispatcher received shutdown signal");
                    break;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_core::bus::OutboundMessage;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct RecordingChannel {
        channel_name: String,
        stopped: Arc<AtomicBool>,
        sent: Arc<AtomicUsize>,
    }

    impl RecordingChannel {
        fn new(name: &str) -> Self {
            Self {
                channel_name: name.into(),
                stopped: Arc::new(AtomicBool::new(false)),
                sent: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            &self.channel_name
        }

        async fn start(&self) -> anyhow::Result<()> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, _msg: &OutboundMessage) -> anyhow::Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(8)));
        assert!(mgr.is_empty());

        mgr.register(Arc::new(RecordingChannel::new("telegram")));
        assert_eq!(mgr.len(), 1);
        assert!(mgr.get("telegram").is_some());
        assert!(mgr.get("discord").is_none());
    }

    #[test]
    fn names_sorted_and_last_registration_wins() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(8)));
        mgr.register(Arc::new(RecordingChannel::new("telegram")));
        mgr.register(Arc::new(RecordingChannel::new("cli")));
        mgr.register(Arc::new(RecordingChannel::new("telegram")));

        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.channel_names(), vec!["cli", "telegram"]);
    }

    #[tokio::test]
    async fn start_all_with_no_channels_returns() {
        let mgr = ChannelManager::new(Arc::new(MessageBus::new(8)));
        mgr.start_all().await.unwrap();
    }

    #[tokio::test]
    async fn stop_all_reaches_channels() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(8)));
        let channel = Arc::new(RecordingChannel::new("t"));
        let stopped = channel.stopped.clone();
        mgr.register(channel);

        mgr.stop_all().await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dispatcher_routes_by_channel_name() {
        let bus = Arc::new(MessageBus::new(8));
        let telegram = Arc::new(RecordingChannel::new("telegram"));
        let cli = Arc::new(RecordingChannel::new("cli"));
        let tg_sent = telegram.sent.clone();
        let cli_sent = cli.sent.clone();

        let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
        channels.insert("telegram".into(), telegram);
        channels.insert("cli".into(), cli);

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(ChannelManager::dispatch_outbound(
            bus.clone(),
            channels,
            shutdown.clone(),
        ));

        bus.publish_outbound(OutboundMessage::new("telegram", "a", "1"))
            .await
            .unwrap();
        bus.publish_outbound(OutboundMessage::new("telegram", "b", "2"))
            .await
            .unwrap();
        bus.publish_outbound(OutboundMessage::new("cli", "c", "3"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        shutdown.notify_waiters();
        let _ = handle.await;

        assert_eq!(tg_sent.load(Ordering::SeqCst), 2);
        assert_eq!(cli_sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatcher_survives_unknown_channel() {
        let bus = Arc::new(MessageBus::new(8));
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(ChannelManager::dispatch_outbound(
            bus.clone(),
            HashMap::new(),
            shutdown.clone(),
        ));

        bus.publish_outbound(OutboundMessage::new("nowhere", "c", "lost"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.notify_waiters();
        handle.await.unwrap();
    }
}
