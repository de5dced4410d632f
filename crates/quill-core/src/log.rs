//! Conversation log — ordered per-conversation message history.
//!
//! One JSONL file per conversation under `~/.quill/conversations/`:
//! - line 1: `{"_type":"metadata","createdAt":"..."}`
//! - lines 2+: `{"role":"user","content":"...","timestamp":"..."}`
//!
//! Appends are single-line writes, so interleaved turns from different
//! conversations never corrupt each other. Only final answers are recorded
//! here; intra-turn tool traffic is never persisted.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Message, Role};
use crate::utils;

// ─────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────

/// Header record written as the first line of each conversation file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogMetadata {
    #[serde(rename = "_type")]
    record_type: String,
    created_at: DateTime<Utc>,
}

/// One logged message.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct LogEntry {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────
// ConversationLog
// ─────────────────────────────────────────────

/// Append/query store for per-conversation history, keyed by
/// `"channel:chat_id"`. In-memory cache over JSONL files.
pub struct ConversationLog {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Vec<LogEntry>>>,
}

impl ConversationLog {
    /// Open (or create) the log directory. Defaults to
    /// `~/.quill/conversations/`.
    pub fn new(dir: Option<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.unwrap_or_else(utils::get_conversations_path);
        std::fs::create_dir_all(&dir)?;
        Ok(ConversationLog {
            dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Append one message to a conversation.
    ///
    /// Persistence failures are logged and swallowed; history loss degrades
    /// quality but must not abort the turn.
    pub fn append(&self, conversation_id: &str, role: Role, text: &str) {
        let entry = LogEntry {
            role,
            content: text.to_string(),
            timestamp: Utc::now(),
        };

        {
            let mut cache = self.cache.write().unwrap();
            let entries = cache
                .entry(conversation_id.to_string())
                .or_insert_with(|| self.load(conversation_id));
            entries.push(entry.clone());
        }

        if let Err(e) = self.append_to_disk(conversation_id, &entry) {
            warn!(conversation = conversation_id, error = %e, "failed to persist log entry");
        }
    }

    /// The last `limit` messages, oldest first.
    pub fn recent_history(&self, conversation_id: &str, limit: usize) -> Vec<Message> {
        let entries = self.entries(conversation_id);
        let skip = entries.len().saturating_sub(limit);
        entries
            .into_iter()
            .skip(skip)
            .map(|e| match e.role {
                Role::User => Message::user(e.content),
                Role::Assistant => Message::assistant(e.content),
            })
            .collect()
    }

    /// Number of messages recorded for a conversation.
    pub fn message_count(&self, conversation_id: &str) -> usize {
        self.entries(conversation_id).len()
    }

    /// Erase a conversation's history (file keeps its metadata header).
    pub fn clear(&self, conversation_id: &str) {
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(conversation_id.to_string(), Vec::new());
        }
        if let Err(e) = self.write_header(conversation_id) {
            warn!(conversation = conversation_id, error = %e, "failed to clear log file");
        }
        debug!(conversation = conversation_id, "conversation cleared");
    }

    /// All conversation ids present on disk.
    pub fn list_conversations(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "failed to read conversations directory");
                return ids;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.replacen('_', ":", 1));
                }
            }
        }
        ids.sort();
        ids
    }

    // ────────────── internals ──────────────

    fn entries(&self, conversation_id: &str) -> Vec<LogEntry> {
        {
            let cache = self.cache.read().unwrap();
            if let Some(entries) = cache.get(conversation_id) {
                return entries.clone();
            }
        }
        let entries = self.load(conversation_id);
        let mut cache = self.cache.write().unwrap();
        cache.insert(conversation_id.to_string(), entries.clone());
        entries
    }

    fn file_path(&self, conversation_id: &str) -> PathBuf {
        let safe = utils::safe_filename(&conversation_id.replace(':', "_"));
        self.dir.join(format!("{safe}.jsonl"))
    }

    fn load(&self, conversation_id: &str) -> Vec<LogEntry> {
        let path = self.file_path(conversation_id);
        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let mut entries = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let Ok(line) = line else { continue };
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(meta) = serde_json::from_str::<LogMetadata>(&line) {
                if meta.record_type == "metadata" {
                    continue;
                }
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(conversation = conversation_id, error = %e, "skipping bad log line"),
            }
        }
        debug!(
            conversation = conversation_id,
            messages = entries.len(),
            "loaded conversation from disk"
        );
        entries
    }

    fn append_to_disk(&self, conversation_id: &str, entry: &LogEntry) -> std::io::Result<()> {
        let path = self.file_path(conversation_id);
        if !path.exists() {
            self.write_header(conversation_id)?;
        }
        let mut file = std::fs::OpenOptions::new().append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;
        Ok(())
    }

    fn write_header(&self, conversation_id: &str) -> std::io::Result<()> {
        let meta = LogMetadata {
            record_type: "metadata".to_string(),
            created_at: Utc::now(),
        };
        let mut file = std::fs::File::create(self.file_path(conversation_id))?;
        writeln!(file, "{}", serde_json::to_string(&meta)?)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageContent;
    use tempfile::tempdir;

    fn make_log() -> (ConversationLog, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
        (log, dir)
    }

    fn text_of(msg: &Message) -> &str {
        match &msg.content {
            MessageContent::Text(t) => t,
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn append_and_read_back() {
        let (log, _dir) = make_log();
        log.append("telegram:1", Role::User, "hello");
        log.append("telegram:1", Role::Assistant, "hi there");

        let history = log.recent_history("telegram:1", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(text_of(&history[0]), "hello");
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn recent_history_returns_tail_oldest_first() {
        let (log, _dir) = make_log();
        for i in 0..8 {
            log.append("cli:direct", Role::User, &format!("msg {i}"));
        }
        let history = log.recent_history("cli:direct", 3);
        assert_eq!(history.len(), 3);
        assert_eq!(text_of(&history[0]), "msg 5");
        assert_eq!(text_of(&history[2]), "msg 7");
    }

    #[test]
    fn recent_history_short_conversation() {
        let (log, _dir) = make_log();
        log.append("a:1", Role::User, "only one");
        assert_eq!(log.recent_history("a:1", 50).len(), 1);
    }

    #[test]
    fn unknown_conversation_is_empty() {
        let (log, _dir) = make_log();
        assert!(log.recent_history("nobody:here", 10).is_empty());
        assert_eq!(log.message_count("nobody:here"), 0);
    }

    #[test]
    fn clear_removes_messages() {
        let (log, _dir) = make_log();
        log.append("telegram:9", Role::User, "a");
        log.append("telegram:9", Role::Assistant, "b");
        log.clear("telegram:9");
        assert!(log.recent_history("telegram:9", 10).is_empty());
    }

    #[test]
    fn clear_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
            log.append("t:1", Role::User, "hello");
            log.clear("t:1");
        }
        let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
        assert!(log.recent_history("t:1", 10).is_empty());
    }

    #[test]
    fn persistence_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
            log.append("telegram:42", Role::User, "remember this");
            log.append("telegram:42", Role::Assistant, "noted");
        }
        let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
        let history = log.recent_history("telegram:42", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(text_of(&history[1]), "noted");
    }

    #[test]
    fn file_format_metadata_then_entries() {
        let dir = tempdir().unwrap();
        let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
        log.append("cli:direct", Role::User, "ping");

        let content = std::fs::read_to_string(dir.path().join("cli_direct.jsonl")).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        let meta: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(meta["_type"], "metadata");
        let entry: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(entry["role"], "user");
        assert_eq!(entry["content"], "ping");
    }

    #[test]
    fn conversations_are_independent() {
        let (log, _dir) = make_log();
        log.append("a:1", Role::User, "for a");
        log.append("b:2", Role::User, "for b");
        log.append("b:2", Role::Assistant, "b again");
        assert_eq!(log.message_count("a:1"), 1);
        assert_eq!(log.message_count("b:2"), 2);
    }

    #[test]
    fn list_conversations_sorted() {
        let (log, _dir) = make_log();
        log.append("telegram:5", Role::User, "x");
        log.append("cli:direct", Role::User, "y");
        let ids = log.list_conversations();
        assert_eq!(ids, vec!["cli:direct", "telegram:5"]);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("cli_direct.jsonl"),
            "{\"_type\":\"metadata\",\"createdAt\":\"2026-01-01T00:00:00Z\"}\nnot json\n{\"role\":\"user\",\"content\":\"ok\",\"timestamp\":\"2026-01-01T00:00:01Z\"}\n",
        )
        .unwrap();
        let log = ConversationLog::new(Some(dir.path().to_path_buf())).unwrap();
        let history = log.recent_history("cli:direct", 10);
        assert_eq!(history.len(), 1);
        assert_eq!(text_of(&history[0]), "ok");
    }
}
