//! Tool executor — performs tool effects and always answers in text.
//!
//! Internally every tool returns `Result<String, ToolError>` so failure
//! classes stay testable; `execute()` flattens errors to short descriptive
//! strings at the boundary where results are folded back into the message
//! sequence. Nothing here panics or propagates a fault to the loop.
//!
//! All filesystem tools resolve paths against the workspace root and refuse
//! anything that normalizes outside it — including `..` traversal and
//! symlinks. That check is the sole security boundary.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use quill_content::{ContentFetcher, FetchedContent};
use quill_core::utils::truncate_string;

use super::catalog::ToolKind;
use crate::turn::TurnContext;

/// Read output budget (chars); larger files are truncated with a notice.
pub const READ_CHAR_LIMIT: usize = 10_000;

/// Search bounds.
const SEARCH_MAX_RESULTS: usize = 20;
const SEARCH_CONTENT_MAX_BYTES: u64 = 100_000;
const SNIPPET_RADIUS: usize = 50;
const DEFAULT_SEARCH_PATTERN: &str = "**/*.md";

/// Directory listing cap.
const LIST_MAX_ENTRIES: usize = 50;

/// Fetch output budgets (chars).
const FETCH_CONTENT_LIMIT: usize = 2_000;
const FETCH_TRANSCRIPT_LIMIT: usize = 8_000;
const FETCH_METADATA_LIMIT: usize = 1_000;

/// Directory names never searched or listed.
const SKIPPED_DIRS: &[&str] = &["venv", "node_modules"];

// ─────────────────────────────────────────────
// ToolError
// ─────────────────────────────────────────────

/// Why a tool invocation failed. Flattened to text at the loop boundary.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    UnknownTool(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Access denied: '{0}' is outside the workspace")]
    AccessDenied(String),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Invalid URL: {0} (must start with http:// or https://)")]
    InvalidUrl(String),
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("{0}")]
    Io(String),
}

// ─────────────────────────────────────────────
// ToolExecutor
// ─────────────────────────────────────────────

/// Executes declared tools inside a workspace root.
pub struct ToolExecutor {
    workspace: PathBuf,
    fetcher: ContentFetcher,
}

impl ToolExecutor {
    pub fn new(workspace: PathBuf) -> Self {
        ToolExecutor {
            workspace,
            fetcher: ContentFetcher::new(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Execute a tool by name. Never fails: every internal error becomes a
    /// short text result the model can read and react to.
    pub async fn execute(&self, name: &str, input: &Value, turn: &mut TurnContext) -> String {
        match self.dispatch(name, input, turn).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                format!("Error: {e}")
            }
        }
    }

    async fn dispatch(
        &self,
        name: &str,
        input: &Value,
        turn: &mut TurnContext,
    ) -> Result<String, ToolError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "executing tool");

        match kind {
            ToolKind::ReadFile => self.read_file(require_str(input, "path")?),
            ToolKind::WriteFile => self.write_file(
                require_str(input, "path")?,
                require_str(input, "content")?,
                turn,
            ),
            ToolKind::AppendFile => self.append_to_file(
                require_str(input, "path")?,
                require_str(input, "content")?,
                turn,
            ),
            ToolKind::SearchFiles => self.search_files(
                require_str(input, "query")?,
                optional_str(input, "file_pattern").unwrap_or(DEFAULT_SEARCH_PATTERN),
            ),
            ToolKind::ListDirectory => {
                self.list_directory(optional_str(input, "path").unwrap_or("."))
            }
            ToolKind::FetchUrl => self.fetch_url(require_str(input, "url")?, turn).await,
            ToolKind::SendFile => {
                self.send_file(require_str(input, "path")?, optional_str(input, "caption"), turn)
            }
        }
    }

    // ────────────── path sandbox ──────────────

    /// Resolve a user-supplied path inside the workspace.
    ///
    /// Relative paths are joined to the root; the result (or its nearest
    /// existing ancestor, for not-yet-created files) is canonicalized and
    /// must stay under the canonicalized root.
    fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let joined = if Path::new(raw).is_absolute() {
            PathBuf::from(raw)
        } else {
            self.workspace.join(raw)
        };
        let resolved = canonicalize_lenient(&joined);

        let root = self
            .workspace
            .canonicalize()
            .unwrap_or_else(|_| self.workspace.clone());
        if resolved.starts_with(&root) || resolved.starts_with(&self.workspace) {
            Ok(resolved)
        } else {
            Err(ToolError::AccessDenied(raw.to_string()))
        }
    }

    // ────────────── filesystem tools ──────────────

    fn read_file(&self, raw: &str) -> Result<String, ToolError> {
        let path = self.resolve(raw)?;
        if !path.exists() {
            return Err(ToolError::FileNotFound(raw.to_string()));
        }
        if !path.is_file() {
            return Err(ToolError::NotAFile(raw.to_string()));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ToolError::Io(format!("Failed to read {raw}: {e}")))?;

        let total = content.chars().count();
        if total > READ_CHAR_LIMIT {
            let kept: String = content.chars().take(READ_CHAR_LIMIT).collect();
            Ok(format!(
                "File content (truncated, {total} chars total):\n{kept}..."
            ))
        } else {
            Ok(content)
        }
    }

    fn write_file(
        &self,
        raw: &str,
        content: &str,
        turn: &mut TurnContext,
    ) -> Result<String, ToolError> {
        let path = self.resolve(raw)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::Io(format!("Failed to create {}: {e}", parent.display())))?;
        }
        std::fs::write(&path, content)
            .map_err(|e| ToolError::Io(format!("Failed to write {raw}: {e}")))?;

        turn.record_action(format!("✅ Wrote: {raw}"));
        Ok(format!(
            "Successfully wrote {} chars to {raw}",
            content.chars().count()
        ))
    }

    fn append_to_file(
        &self,
        raw: &str,
        content: &str,
        turn: &mut TurnContext,
    ) -> Result<String, ToolError> {
        let path = self.resolve(raw)?;

        if path.exists() {
            let existing = std::fs::read_to_string(&path)
                .map_err(|e| ToolError::Io(format!("Failed to read {raw}: {e}")))?;
            std::fs::write(&path, format!("{existing}\n{content}"))
                .map_err(|e| ToolError::Io(format!("Failed to write {raw}: {e}")))?;
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ToolError::Io(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            std::fs::write(&path, content)
                .map_err(|e| ToolError::Io(format!("Failed to write {raw}: {e}")))?;
        }

        turn.record_action(format!("✅ Appended: {raw}"));
        Ok(format!(
            "Appended {} chars to {raw}",
            content.chars().count()
        ))
    }

    fn search_files(&self, query: &str, pattern: &str) -> Result<String, ToolError> {
        let full_pattern = self.workspace.join(pattern);
        let paths = glob::glob(&full_pattern.to_string_lossy()).map_err(|e| {
            ToolError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.msg.to_string(),
            }
        })?;

        let root = self
            .workspace
            .canonicalize()
            .unwrap_or_else(|_| self.workspace.clone());
        let query_lower = query.to_lowercase();
        let mut results = Vec::new();

        for path in paths.flatten() {
            if !path.is_file() {
                continue;
            }
            // a pattern like "../**" could walk out of the workspace
            let Ok(canonical) = path.canonicalize() else {
                continue;
            };
            if !canonical.starts_with(&root) {
                continue;
            }

            let rel = path.strip_prefix(&self.workspace).unwrap_or(&path);
            if is_skipped(rel) {
                continue;
            }

            // filename match short-circuits the content scan
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if filename.contains(&query_lower) {
                results.push(format!("📄 {} (name match)", rel.display()));
                continue;
            }

            let Ok(meta) = path.metadata() else { continue };
            if meta.len() >= SEARCH_CONTENT_MAX_BYTES {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            if let Some(idx) = content.to_lowercase().find(&query_lower) {
                let snippet = snippet_around(&content, idx, query.len());
                results.push(format!("📄 {}: ...{snippet}...", rel.display()));
            }
        }

        if results.is_empty() {
            return Ok(format!("No files found matching '{query}'"));
        }
        let total = results.len();
        results.truncate(SEARCH_MAX_RESULTS);
        Ok(format!("Found {total} result(s):\n{}", results.join("\n")))
    }

    fn list_directory(&self, raw: &str) -> Result<String, ToolError> {
        let path = self.resolve(raw)?;
        if !path.exists() {
            return Err(ToolError::DirectoryNotFound(raw.to_string()));
        }
        if !path.is_dir() {
            return Err(ToolError::NotADirectory(raw.to_string()));
        }

        let mut entries: Vec<_> = std::fs::read_dir(&path)
            .map_err(|e| ToolError::Io(format!("Failed to read directory {raw}: {e}")))?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut lines = Vec::new();
        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                lines.push(format!("📁 {name}/"));
            } else {
                lines.push(format!("📄 {name}"));
            }
            if lines.len() >= LIST_MAX_ENTRIES {
                break;
            }
        }

        if lines.is_empty() {
            Ok(format!("Contents of {raw}:\n(empty directory)"))
        } else {
            Ok(format!("Contents of {raw}:\n{}", lines.join("\n")))
        }
    }

    // ────────────── fetch + delivery ──────────────

    async fn fetch_url(&self, url: &str, turn: &mut TurnContext) -> Result<String, ToolError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidUrl(url.to_string()));
        }

        let fetched = self.fetcher.fetch(url).await;
        turn.record_action("🔗 Fetched URL content");
        Ok(format_fetched(&fetched))
    }

    fn send_file(
        &self,
        raw: &str,
        caption: Option<&str>,
        turn: &mut TurnContext,
    ) -> Result<String, ToolError> {
        let path = self.resolve(raw)?;
        if !path.exists() {
            return Err(ToolError::FileNotFound(raw.to_string()));
        }
        if !path.is_file() {
            return Err(ToolError::NotAFile(raw.to_string()));
        }

        let size = path.metadata().map(|m| m.len()).unwrap_or(0);
        let caption = match caption.filter(|c| !c.is_empty()) {
            Some(c) => c.to_string(),
            None => format!(
                "📄 {}",
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ),
        };

        turn.queue_attachment(path, caption);
        turn.record_action(format!("📎 Sending: {raw}"));
        Ok(format!("Queued file for sending: {raw} ({size} bytes)"))
    }
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn require_str<'a>(input: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or(ToolError::MissingParameter(key))
}

fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(|v| v.as_str())
}

/// Canonicalize, tolerating paths that don't exist yet: `.`/`..` are
/// resolved lexically, then the nearest existing ancestor is canonicalized
/// so symlinked parents can't smuggle a path outside the root.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }

    if let (Some(parent), Some(name)) = (normalized.parent(), normalized.file_name()) {
        if let Ok(canonical_parent) = parent.canonicalize() {
            return canonical_parent.join(name);
        }
    }
    normalized
}

/// Whether a relative path passes through a hidden or vendored directory.
fn is_skipped(rel: &Path) -> bool {
    rel.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
    })
}

/// Fixed-width window around the first match, flattened to one line.
fn snippet_around(content: &str, idx: usize, match_len: usize) -> String {
    let start = floor_char_boundary(content, idx.saturating_sub(SNIPPET_RADIUS));
    let end = floor_char_boundary(
        content,
        (idx + match_len + SNIPPET_RADIUS).min(content.len()),
    );
    content[start..end].replace(['\n', '\r'], " ")
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Render fetched content as one bounded text block for the model.
fn format_fetched(fetched: &FetchedContent) -> String {
    let mut out = format!(
        "**{}**: {}\n",
        fetched.platform.to_string().to_uppercase(),
        fetched.url
    );
    if let Some(title) = &fetched.title {
        out.push_str(&format!("Title: {title}\n"));
    }
    if let Some(author) = &fetched.author {
        out.push_str(&format!("Author: {author}\n"));
    }
    if let Some(error) = &fetched.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    if let Some(content) = &fetched.content {
        out.push_str(&format!(
            "Content: {}\n",
            truncate_string(content, FETCH_CONTENT_LIMIT)
        ));
    }
    if let Some(transcript) = &fetched.transcript {
        if transcript.chars().count() > FETCH_TRANSCRIPT_LIMIT {
            out.push_str(&format!(
                "Transcript (truncated):\n{}\n",
                truncate_string(transcript, FETCH_TRANSCRIPT_LIMIT)
            ));
        } else {
            out.push_str(&format!("Transcript:\n{transcript}\n"));
        }
    }
    if let Some(metadata) = &fetched.metadata {
        let pretty = serde_json::to_string_pretty(metadata).unwrap_or_default();
        out.push_str(&format!(
            "Metadata: {}\n",
            truncate_string(&pretty, FETCH_METADATA_LIMIT)
        ));
    }
    out
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
