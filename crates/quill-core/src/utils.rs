//! Small helpers — data-dir paths, string truncation, filename sanitizing.

use std::path::PathBuf;

/// Quill data directory (`~/.quill/`).
pub fn get_data_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quill")
}

/// Conversation log directory (`~/.quill/conversations/`).
pub fn get_conversations_path() -> PathBuf {
    get_data_path().join("conversations")
}

/// Default workspace directory (`~/.quill/workspace/`).
pub fn get_default_workspace_path() -> PathBuf {
    get_data_path().join("workspace")
}

/// Directory for media downloaded from channels (`~/.quill/media/`).
pub fn get_media_path() -> PathBuf {
    get_data_path().join("media")
}

/// Today's date as `YYYY-MM-DD`.
pub fn today_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Truncate to at most `max_len` characters, appending `...` when cut.
/// Unicode-safe (counts chars, not bytes).
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Replace anything that isn't alphanumeric, `-`, `_`, or `.` with `_`.
pub fn safe_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("exact", 5), "exact");
    }

    #[test]
    fn truncate_cuts_long_strings() {
        let out = truncate_string("a very long diagnostic message", 12);
        assert_eq!(out, "a very lo...");
        assert!(out.chars().count() <= 12);
    }

    #[test]
    fn truncate_handles_unicode() {
        let out = truncate_string("日本語のテキストです", 6);
        assert_eq!(out, "日本語...");
    }

    #[test]
    fn safe_filename_replaces_specials() {
        assert_eq!(safe_filename("telegram_chat 42"), "telegram_chat_42");
        assert_eq!(safe_filename("a/b:c"), "a_b_c");
        assert_eq!(safe_filename("keep-this_v1.txt"), "keep-this_v1.txt");
    }

    #[test]
    fn expand_home_replaces_tilde() {
        let path = expand_home("~/notes");
        assert!(!path.to_string_lossy().contains('~'));
        assert!(path.ends_with("notes"));
    }

    #[test]
    fn expand_home_leaves_absolute() {
        assert_eq!(expand_home("/srv/data"), PathBuf::from("/srv/data"));
    }

    #[test]
    fn data_paths_nest_under_dot_quill() {
        assert!(get_data_path().ends_with(".quill"));
        assert!(get_conversations_path().ends_with("conversations"));
        assert!(get_media_path().parent().unwrap().ends_with(".quill"));
    }

    #[test]
    fn today_date_shape() {
        let date = today_date();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&date[7..8], "-");
    }
}
