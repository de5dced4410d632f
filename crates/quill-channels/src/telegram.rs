//! Telegram channel — long-polling bot via `teloxide`.
//!
//! - Text, photo, and document messages (media downloaded locally)
//! - Allow-list by user id or username
//! - Commands: /start, /help, /clear, /status
//! - Typing indicator while the agent works
//! - Markdown → Telegram HTML with plain-text fallback
//! - Responses chunked at the 4096-char cap, then queued attachments sent
//!   as documents

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, ChatAction, FileId, InputFile, MediaKind, MessageKind, ParseMode, UpdateKind,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use quill_core::bus::{InboundMessage, MediaAttachment, MessageBus, OutboundMessage};
use quill_core::log::ConversationLog;

use crate::base::Channel;
use crate::formatting::{markdown_to_telegram_html, split_message};

/// Telegram message length cap.
const TELEGRAM_MAX_LEN: usize = 4096;

/// Telegram caption length cap.
const CAPTION_MAX_LEN: usize = 1024;

/// Typing indicator refresh interval and lifetime.
const TYPING_REFRESH_SECS: u64 = 5;
const TYPING_MAX_REFRESHES: u32 = 24;

// ─────────────────────────────────────────────
// TelegramChannel
// ─────────────────────────────────────────────

pub struct TelegramChannel {
    token: String,
    bus: Arc<MessageBus>,
    allowed_users: Vec<String>,
    /// Wired in for /clear and /status; commands degrade gracefully without.
    log: Option<Arc<ConversationLog>>,
    shutdown: Arc<Notify>,
}

impl TelegramChannel {
    pub fn new(token: String, bus: Arc<MessageBus>, allowed_users: Vec<String>) -> Self {
        Self {
            token,
            bus,
            allowed_users,
            log: None,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Give commands access to the conversation log.
    pub fn with_conversation_log(mut self, log: Arc<ConversationLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Sender id format is `"user_id|username"`; either part may match the
    /// allow-list. An empty allow-list admits everyone.
    fn is_allowed(&self, sender_id: &str) -> bool {
        if self.allowed_users.is_empty() {
            return true;
        }
        sender_id
            .split('|')
            .chain(std::iter::once(sender_id))
            .any(|part| !part.is_empty() && self.allowed_users.iter().any(|u| u == part))
    }

    async fn handle_update(&self, bot: &Bot, update: &Update) {
        let UpdateKind::Message(message) = &update.kind else {
            return;
        };
        let Some(user) = message.from.as_ref() else {
            return;
        };

        let user_id = user.id.0.to_string();
        let username = user.username.as_deref().unwrap_or("").to_string();
        let sender_id = format!("{user_id}|{username}");
        let chat_id = message.chat.id.0.to_string();

        if !self.is_allowed(&sender_id) {
            warn!(sender = %sender_id, chat = %chat_id, "unauthorized telegram user, ignoring");
            return;
        }

        if let Some(text) = message.text() {
            if text.starts_with('/') {
                self.handle_command(bot, message, text, &user.first_name).await;
                return;
            }
        }

        let mut content_parts: Vec<String> = Vec::new();
        let mut media_paths: Vec<String> = Vec::new();

        match &message.kind {
            MessageKind::Common(common) => match &common.media_kind {
                MediaKind::Text(text) => content_parts.push(text.text.clone()),
                MediaKind::Photo(photo) => {
                    if let Some(caption) = &photo.caption {
                        content_parts.push(caption.clone());
                    }
                    // largest size last
                    if let Some(largest) = photo.photo.last() {
                        match self.download_file(bot, &largest.file.id.0).await {
                            Ok(path) => media_paths.push(path),
                            Err(e) => {
                                warn!(error = %e, "failed to download photo");
                                content_parts.push("[photo: download failed]".into());
                            }
                        }
                    }
                }
                MediaKind::Document(doc) => {
                    if let Some(caption) = &doc.caption {
                        content_parts.push(caption.clone());
                    }
                    match self.download_file(bot, &doc.document.file.id.0).await {
                        Ok(path) => {
                            content_parts.push(format!("[file: {path}]"));
                            media_paths.push(path);
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to download document");
                            content_parts.push("[file: download failed]".into());
                        }
                    }
                }
                _ => {
                    debug!("unsupported telegram media kind, ignoring");
                    return;
                }
            },
            _ => return,
        }

        let mut content = content_parts.join("\n");
        if content.is_empty() {
            if media_paths.is_empty() {
                return;
            }
            content = "What's in this image?".to_string();
        }

        debug!(sender = %sender_id, chat = %chat_id, len = content.len(), "telegram inbound");

        self.start_typing(bot, message.chat.id);

        let mut inbound = InboundMessage::new("telegram", &sender_id, &chat_id, &content);
        for path in media_paths {
            inbound.media.push(MediaAttachment {
                path,
                mime_type: "image/jpeg".into(),
                filename: None,
            });
        }
        inbound.metadata.insert("user_id".into(), user_id);
        inbound.metadata.insert("username".into(), username);
        inbound
            .metadata
            .insert("message_id".into(), message.id.0.to_string());

        if let Err(e) = self.bus.publish_inbound(inbound).await {
            error!(error = %e, "failed to publish telegram message to bus");
        }
    }

    async fn handle_command(&self, bot: &Bot, message: &Message, text: &str, first_name: &str) {
        let command = text.split_whitespace().next().unwrap_or("");
        // strip "@botname" suffix from group commands
        let command = command.split('@').next().unwrap_or(command);
        let chat = message.chat.id;
        let conversation = format!("telegram:{}", chat.0);

        match command {
            "/start" => {
                let greeting = format!(
                    "👋 Hi {first_name}! I'm Quill, your workspace assistant.\n\n\
                     I can read and write files in your workspace, search your notes, \
                     fetch links (YouTube, Reddit, articles), and send you files.\n\n\
                     Just send a message or share a link!"
                );
                let _ = bot.send_message(chat, greeting).await;
            }
            "/help" => {
                let help = "🪶 <b>Quill Commands</b>\n\n\
                     /clear — Clear conversation history\n\
                     /status — Show bot status\n\
                     /help — Show this message\n\n\
                     <b>Things to try</b>\n\
                     • \"What's in my current state?\"\n\
                     • \"Save this to content/ideas.md\"\n\
                     • \"Search for meeting notes\"\n\
                     • \"Send me state/goals.md\"\n\
                     • Share any link for analysis";
                let _ = bot.send_message(chat, help).parse_mode(ParseMode::Html).await;
            }
            "/clear" => {
                if let Some(log) = &self.log {
                    log.clear(&conversation);
                    let _ = bot.send_message(chat, "🧹 Conversation history cleared.").await;
                } else {
                    let _ = bot
                        .send_message(chat, "History isn't wired up on this deployment.")
                        .await;
                }
            }
            "/status" => {
                let history = self
                    .log
                    .as_ref()
                    .map(|log| log.message_count(&conversation))
                    .unwrap_or(0);
                let status = format!(
                    "🪶 Quill status\n\
                     • Messages in history: {history}\n\
                     • Chat ID: {}",
                    chat.0
                );
                let _ = bot.send_message(chat, status).await;
            }
            _ => {
                debug!(command = command, "unknown telegram command");
            }
        }
    }

    /// Keep the "typing…" indicator alive while the agent works. Bounded, so
    /// an abandoned turn stops signalling on its own.
    fn start_typing(&self, bot: &Bot, chat: ChatId) {
        let bot = bot.clone();
        tokio::spawn(async move {
            for _ in 0..TYPING_MAX_REFRESHES {
                if bot.send_chat_action(chat, ChatAction::Typing).await.is_err() {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_secs(TYPING_REFRESH_SECS)).await;
            }
        });
    }

    /// Download a Telegram file into the local media directory.
    async fn download_file(&self, bot: &Bot, file_id: &str) -> anyhow::Result<String> {
        let file = bot.get_file(FileId(file_id.to_string())).send().await?;

        let media_dir = quill_core::utils::get_media_path();
        std::fs::create_dir_all(&media_dir)?;

        let ext = file
            .path
            .rsplit('.')
            .next()
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let local_path = media_dir.join(format!("{}{}", file_id.replace('/', "_"), ext));

        let mut dst = tokio::fs::File::create(&local_path).await?;
        let mut stream = bot.download_file_stream(&file.path);
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            dst.write_all(&chunk?).await?;
        }

        info!(path = %local_path.display(), "downloaded telegram file");
        Ok(local_path.display().to_string())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> anyhow::Result<()> {
        info!("starting telegram channel (long polling)");
        let bot = Bot::new(&self.token);

        let commands = vec![
            BotCommand::new("start", "Start the bot"),
            BotCommand::new("help", "Show available commands"),
            BotCommand::new("clear", "Clear conversation history"),
            BotCommand::new("status", "Show bot status"),
        ];
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to set bot commands menu");
        }

        let mut offset: i32 = 0;
        loop {
            tokio::select! {
                updates = bot.get_updates().offset(offset).timeout(30).send() => {
                    match updates {
                        Ok(updates) => {
                            for update in &updates {
                                offset = (update.id.0 as i32).wrapping_add(1);
                                self.handle_update(&bot, update).await;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "telegram polling error");
                            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("telegram channel shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.shutdown.notify_waiters();
        Ok(())
    }

    /// Deliver response text (chunked, HTML with plain fallback), then any
    /// queued attachments as documents.
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        let bot = Bot::new(&self.token);
        let chat_id: i64 = msg
            .chat_id
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid telegram chat_id: {}", msg.chat_id))?;
        let chat = ChatId(chat_id);

        let html = markdown_to_telegram_html(&msg.content);
        for chunk in split_message(&html, TELEGRAM_MAX_LEN) {
            let sent = bot
                .send_message(chat, chunk)
                .parse_mode(ParseMode::Html)
                .await;
            if let Err(e) = sent {
                debug!(error = %e, "HTML send failed, falling back to plain text");
                for plain in split_message(&msg.content, TELEGRAM_MAX_LEN) {
                    let _ = bot.send_message(chat, plain).await;
                }
                break;
            }
        }

        for attachment in &msg.attachments {
            let caption: String = attachment.caption.chars().take(CAPTION_MAX_LEN).collect();
            let result = bot
                .send_document(chat, InputFile::file(&attachment.path))
                .caption(caption)
                .await;
            match result {
                Ok(_) => info!(path = %attachment.path.display(), "sent attachment"),
                Err(e) => {
                    error!(path = %attachment.path.display(), error = %e, "attachment send failed");
                    let _ = bot
                        .send_message(chat, format!("Error sending file: {e}"))
                        .await;
                }
            }
        }

        debug!(chat_id = chat_id, "telegram message delivered");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn open_channel() -> TelegramChannel {
        TelegramChannel::new("token".into(), Arc::new(MessageBus::new(8)), vec![])
    }

    fn restricted_channel() -> TelegramChannel {
        TelegramChannel::new(
            "token".into(),
            Arc::new(MessageBus::new(8)),
            vec!["123456".into(), "alice".into()],
        )
    }

    #[test]
    fn channel_name() {
        assert_eq!(open_channel().name(), "telegram");
    }

    #[test]
    fn empty_allow_list_admits_everyone() {
        let ch = open_channel();
        assert!(ch.is_allowed("999|whoever"));
        assert!(ch.is_allowed("anything"));
    }

    #[test]
    fn allow_list_matches_id_or_username() {
        let ch = restricted_channel();
        assert!(ch.is_allowed("123456|someone"));
        assert!(ch.is_allowed("999|alice"));
        assert!(ch.is_allowed("123456"));
        assert!(!ch.is_allowed("999|mallory"));
    }

    #[test]
    fn conversation_log_is_optional() {
        let ch = open_channel();
        assert!(ch.log.is_none());

        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(ConversationLog::new(Some(dir.path().to_path_buf())).unwrap());
        let ch = open_channel().with_conversation_log(log);
        assert!(ch.log.is_some());
    }
}
