//! Content extraction — resolves a URL into structured text.
//!
//! Platform-specific fetchers (YouTube transcripts, Reddit posts, generic
//! web pages) all produce a [`FetchedContent`]: title, author, body text,
//! transcript, metadata, or a populated `error` string. An error here is a
//! presentable result for the model to reason about, never a fault.

pub mod fetcher;

use serde::Serialize;

pub use fetcher::ContentFetcher;

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// Which fetcher handles a URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Reddit,
    Twitter,
    Instagram,
    LinkedIn,
    #[default]
    Web,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::YouTube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::LinkedIn => "linkedin",
            Platform::Web => "web",
        };
        f.write_str(name)
    }
}

/// Structured result of fetching a URL.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedContent {
    pub url: String,
    pub platform: Platform,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Main body text (bounded).
    pub content: Option<String>,
    /// Timestamped transcript, when the platform provides one.
    pub transcript: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Non-fatal failure description.
    pub error: Option<String>,
}

impl FetchedContent {
    /// Empty result for a URL on a platform.
    pub fn empty(url: impl Into<String>, platform: Platform) -> Self {
        FetchedContent {
            url: url.into(),
            platform,
            ..Default::default()
        }
    }

    /// Error-only result.
    pub fn failed(url: impl Into<String>, platform: Platform, error: impl Into<String>) -> Self {
        FetchedContent {
            url: url.into(),
            platform,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Extract all http(s) URLs from free text.
pub fn extract_links(text: &str) -> Vec<String> {
    let re = regex::Regex::new(r#"https?://[^\s<>"]+"#).expect("valid URL regex");
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_display_lowercase() {
        assert_eq!(Platform::YouTube.to_string(), "youtube");
        assert_eq!(Platform::Web.to_string(), "web");
    }

    #[test]
    fn failed_sets_only_error() {
        let result = FetchedContent::failed("https://x.com/post/1", Platform::Twitter, "nope");
        assert_eq!(result.error.as_deref(), Some("nope"));
        assert!(result.title.is_none());
        assert!(result.transcript.is_none());
    }

    #[test]
    fn extract_links_finds_urls() {
        let links =
            extract_links("see https://example.com/a and more at http://example.org/b?x=1 today");
        assert_eq!(
            links,
            vec!["https://example.com/a", "http://example.org/b?x=1"]
        );
    }

    #[test]
    fn extract_links_empty_text() {
        assert!(extract_links("no urls here").is_empty());
    }
}
