//! The fetcher — platform detection and per-platform extraction.

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::{FetchedContent, Platform};

/// Browser-ish User-Agent; some endpoints reject the default reqwest UA.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Per-request timeout.
const FETCH_TIMEOUT_SECS: u64 = 15;

/// Generic web page body cap.
const WEB_CONTENT_LIMIT: usize = 5_000;

/// Reddit comment bounds.
const TOP_COMMENT_COUNT: usize = 5;
const COMMENT_BODY_LIMIT: usize = 500;

// ─────────────────────────────────────────────
// ContentFetcher
// ─────────────────────────────────────────────

/// Fetches and extracts content from URLs.
pub struct ContentFetcher {
    client: reqwest::Client,
}

impl Default for ContentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch any supported URL. Always returns a result; failures populate
    /// the `error` field.
    pub async fn fetch(&self, url: &str) -> FetchedContent {
        let platform = detect_platform(url);
        debug!(url = %url, platform = %platform, "fetching content");

        match platform {
            Platform::YouTube => self.fetch_youtube(url).await,
            Platform::Reddit => self.fetch_reddit(url).await,
            Platform::Instagram => self.fetch_instagram(url).await,
            Platform::Twitter => FetchedContent::failed(
                url,
                Platform::Twitter,
                "Twitter/X content requires API access",
            ),
            Platform::LinkedIn => FetchedContent::failed(
                url,
                Platform::LinkedIn,
                "LinkedIn content is restricted without authentication",
            ),
            Platform::Web => self.fetch_web(url).await,
        }
    }

    // ────────────── YouTube ──────────────

    async fn fetch_youtube(&self, url: &str) -> FetchedContent {
        let Some(video_id) = extract_youtube_id(url) else {
            return FetchedContent::failed(
                url,
                Platform::YouTube,
                "Could not extract YouTube video ID",
            );
        };

        let mut result = FetchedContent::empty(url, Platform::YouTube);
        result.metadata = Some(json!({ "videoId": video_id }));

        // Title and author via oEmbed (no API key needed)
        let oembed = format!(
            "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={video_id}&format=json"
        );
        if let Ok(resp) = self.client.get(&oembed).send().await {
            if resp.status().is_success() {
                if let Ok(data) = resp.json::<Value>().await {
                    result.title = data["title"].as_str().map(String::from);
                    result.author = data["author_name"].as_str().map(String::from);
                }
            }
        }

        // Transcript via the timedtext endpoint
        let timedtext = format!("https://video.google.com/timedtext?lang=en&v={video_id}");
        match self.client.get(&timedtext).send().await {
            Ok(resp) if resp.status().is_success() => {
                let xml = resp.text().await.unwrap_or_default();
                match parse_timedtext(&xml) {
                    Some((transcript, segments)) => {
                        result.content =
                            Some(format!("YouTube video with {segments} transcript segments"));
                        result.transcript = Some(transcript);
                    }
                    None => {
                        result.error = Some("No transcript available for this video".to_string());
                    }
                }
            }
            Ok(resp) => {
                result.error = Some(format!(
                    "Could not fetch transcript: HTTP {}",
                    resp.status().as_u16()
                ));
            }
            Err(e) => {
                result.error = Some(format!("Could not fetch transcript: {e}"));
            }
        }

        result
    }

    // ────────────── Reddit ──────────────

    async fn fetch_reddit(&self, url: &str) -> FetchedContent {
        // Reddit serves post + comments as JSON when .json is appended
        let json_url = format!("{}.json", url.trim_end_matches('/'));
        match self.client.get(&json_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(data) => parse_reddit_listing(url, &data),
                Err(e) => FetchedContent::failed(
                    url,
                    Platform::Reddit,
                    format!("Could not parse Reddit response: {e}"),
                ),
            },
            Ok(resp) => FetchedContent::failed(
                url,
                Platform::Reddit,
                format!("Reddit returned status {}", resp.status().as_u16()),
            ),
            Err(e) => FetchedContent::failed(
                url,
                Platform::Reddit,
                format!("Could not fetch Reddit post: {e}"),
            ),
        }
    }

    // ────────────── Instagram ──────────────

    async fn fetch_instagram(&self, url: &str) -> FetchedContent {
        let mut result = FetchedContent::empty(url, Platform::Instagram);
        let oembed = format!("https://api.instagram.com/oembed?url={url}");

        match self.client.get(&oembed).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(data) = resp.json::<Value>().await {
                    result.title = data["title"].as_str().map(String::from);
                    result.author = data["author_name"].as_str().map(String::from);
                    result.content = result
                        .title
                        .clone()
                        .or_else(|| Some("Instagram content".to_string()));
                    result.metadata = Some(json!({
                        "authorUrl": data["author_url"],
                        "thumbnailUrl": data["thumbnail_url"],
                    }));
                }
            }
            _ => {
                result.content = Some("Instagram content (requires login to view)".to_string());
                result.error = Some("Instagram content is restricted".to_string());
            }
        }

        result
    }

    // ────────────── Generic web ──────────────

    async fn fetch_web(&self, url: &str) -> FetchedContent {
        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let html = resp.text().await.unwrap_or_default();
                let mut result = FetchedContent::empty(url, Platform::Web);
                result.title = extract_title(&html);
                let text = strip_html(&html);
                result.content = Some(text.chars().take(WEB_CONTENT_LIMIT).collect());
                result
            }
            Ok(resp) => FetchedContent::failed(
                url,
                Platform::Web,
                format!("HTTP {}", resp.status().as_u16()),
            ),
            Err(e) => {
                FetchedContent::failed(url, Platform::Web, format!("Could not fetch page: {e}"))
            }
        }
    }
}

// ─────────────────────────────────────────────
// Pure helpers (testable without network)
// ─────────────────────────────────────────────

/// Decide which fetcher owns a URL based on its host.
pub fn detect_platform(url: &str) -> Platform {
    let host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default();

    if host.contains("youtube.com") || host.contains("youtu.be") {
        Platform::YouTube
    } else if host.contains("reddit.com") || host.contains("redd.it") {
        Platform::Reddit
    } else if host.contains("twitter.com") || host == "x.com" || host.ends_with(".x.com") {
        Platform::Twitter
    } else if host.contains("instagram.com") {
        Platform::Instagram
    } else if host.contains("linkedin.com") {
        Platform::LinkedIn
    } else {
        Platform::Web
    }
}

/// Pull the video id out of the common YouTube URL shapes.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    if host.contains("youtu.be") {
        let id = parsed.path().trim_start_matches('/');
        return (!id.is_empty()).then(|| id.split('/').next().unwrap_or(id).to_string());
    }

    if host.contains("youtube.com") {
        if parsed.path() == "/watch" {
            return parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned());
        }
        for prefix in ["/shorts/", "/live/"] {
            if let Some(rest) = parsed.path().strip_prefix(prefix) {
                let id = rest.split('/').next().unwrap_or("");
                return (!id.is_empty()).then(|| id.to_string());
            }
        }
    }

    None
}

/// Parse a timedtext XML document into `[m:ss] line` transcript text.
/// Returns the transcript plus the segment count, or `None` when empty.
fn parse_timedtext(xml: &str) -> Option<(String, usize)> {
    let re = Regex::new(r#"(?s)<text start="([0-9.]+)"[^>]*>(.*?)</text>"#).expect("valid regex");
    let mut lines = Vec::new();
    for caps in re.captures_iter(xml) {
        let start: f64 = caps[1].parse().unwrap_or(0.0);
        let body = decode_entities(&caps[2]);
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        lines.push(format!("{} {}", format_timestamp(start), body));
    }
    if lines.is_empty() {
        None
    } else {
        let count = lines.len();
        Some((lines.join("\n"), count))
    }
}

/// `[m:ss]`, or `[h:mm:ss]` past the hour.
fn format_timestamp(seconds: f64) -> String {
    let total = seconds as u64;
    let (hours, rem) = (total / 3600, total % 3600);
    let (mins, secs) = (rem / 60, rem % 60);
    if hours > 0 {
        format!("[{hours}:{mins:02}:{secs:02}]")
    } else {
        format!("[{mins}:{secs:02}]")
    }
}

/// Build a `FetchedContent` from Reddit's two-element listing JSON.
fn parse_reddit_listing(url: &str, data: &Value) -> FetchedContent {
    let post = &data[0]["data"]["children"][0]["data"];
    if !post.is_object() {
        return FetchedContent::failed(url, Platform::Reddit, "Unexpected Reddit response shape");
    }

    let mut result = FetchedContent::empty(url, Platform::Reddit);
    result.title = post["title"].as_str().map(String::from);
    result.author = post["author"].as_str().map(String::from);
    result.content = post["selftext"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| post["url"].as_str())
        .map(String::from);

    let mut metadata = json!({
        "subreddit": post["subreddit"],
        "score": post["score"],
        "numComments": post["num_comments"],
    });

    // Top comments ride in the second listing element
    if let Some(children) = data[1]["data"]["children"].as_array() {
        let top: Vec<Value> = children
            .iter()
            .filter(|c| c["kind"] == "t1")
            .take(TOP_COMMENT_COUNT)
            .map(|c| {
                let comment = &c["data"];
                let body: String = comment["body"]
                    .as_str()
                    .unwrap_or("")
                    .chars()
                    .take(COMMENT_BODY_LIMIT)
                    .collect();
                json!({
                    "author": comment["author"],
                    "body": body,
                    "score": comment["score"],
                })
            })
            .collect();
        if !top.is_empty() {
            metadata["topComments"] = Value::Array(top);
        }
    }

    result.metadata = Some(metadata);
    result
}

/// `<title>` tag contents, if any.
fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("valid regex");
    re.captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Strip scripts, styles, and tags; collapse whitespace.
fn strip_html(html: &str) -> String {
    let no_scripts = Regex::new(r"(?is)<script[^>]*>.*?</script>")
        .expect("valid regex")
        .replace_all(html, "");
    let no_styles = Regex::new(r"(?is)<style[^>]*>.*?</style>")
        .expect("valid regex")
        .replace_all(&no_scripts, "");
    let no_tags = Regex::new(r"<[^>]+>")
        .expect("valid regex")
        .replace_all(&no_styles, " ");
    let collapsed = Regex::new(r"\s+")
        .expect("valid regex")
        .replace_all(&no_tags, " ");
    decode_entities(collapsed.trim())
}

/// Decode the handful of entities that matter for plain-text output.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── platform detection ──

    #[test]
    fn detects_youtube_hosts() {
        assert_eq!(
            detect_platform("https://www.youtube.com/watch?v=abc123"),
            Platform::YouTube
        );
        assert_eq!(detect_platform("https://youtu.be/abc123"), Platform::YouTube);
    }

    #[test]
    fn detects_reddit_twitter_and_web() {
        assert_eq!(
            detect_platform("https://www.reddit.com/r/rust/comments/xyz/post/"),
            Platform::Reddit
        );
        assert_eq!(detect_platform("https://x.com/someone/status/1"), Platform::Twitter);
        assert_eq!(
            detect_platform("https://twitter.com/someone/status/1"),
            Platform::Twitter
        );
        assert_eq!(detect_platform("https://example.com/article"), Platform::Web);
    }

    #[test]
    fn xcom_lookalike_is_web() {
        assert_eq!(detect_platform("https://notx.com/page"), Platform::Web);
    }

    #[test]
    fn invalid_url_is_web() {
        assert_eq!(detect_platform("not a url"), Platform::Web);
    }

    // ── video id extraction ──

    #[test]
    fn youtube_id_from_watch_url() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn youtube_id_from_short_link() {
        assert_eq!(
            extract_youtube_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn youtube_id_from_shorts_and_live() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/shorts/abc/extra"),
            Some("abc".into())
        );
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/live/xyz9"),
            Some("xyz9".into())
        );
    }

    #[test]
    fn youtube_id_missing() {
        assert_eq!(extract_youtube_id("https://www.youtube.com/feed/library"), None);
        assert_eq!(extract_youtube_id("https://example.com/watch?v=nope"), None);
    }

    // ── transcript parsing ──

    #[test]
    fn timedtext_parses_segments() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0.0" dur="2.5">Hello &amp; welcome</text>
            <text start="65.2" dur="3.0">Second line</text>
        </transcript>"#;
        let (transcript, segments) = parse_timedtext(xml).unwrap();
        assert_eq!(segments, 2);
        assert!(transcript.contains("[0:00] Hello & welcome"));
        assert!(transcript.contains("[1:05] Second line"));
    }

    #[test]
    fn timedtext_empty_is_none() {
        assert!(parse_timedtext("<transcript></transcript>").is_none());
        assert!(parse_timedtext("").is_none());
    }

    #[test]
    fn timestamps_roll_past_the_hour() {
        assert_eq!(format_timestamp(59.9), "[0:59]");
        assert_eq!(format_timestamp(61.0), "[1:01]");
        assert_eq!(format_timestamp(3725.0), "[1:02:05]");
    }

    // ── reddit parsing ──

    #[test]
    fn reddit_listing_parses_post_and_comments() {
        let data = serde_json::json!([
            {"data": {"children": [{"data": {
                "title": "Interesting post",
                "author": "someone",
                "selftext": "Body text here",
                "subreddit": "rust",
                "score": 321,
                "num_comments": 2
            }}]}},
            {"data": {"children": [
                {"kind": "t1", "data": {"author": "a", "body": "first comment", "score": 10}},
                {"kind": "more", "data": {}},
                {"kind": "t1", "data": {"author": "b", "body": "second", "score": 3}}
            ]}}
        ]);
        let result = parse_reddit_listing("https://reddit.com/r/rust/1", &data);
        assert_eq!(result.title.as_deref(), Some("Interesting post"));
        assert_eq!(result.author.as_deref(), Some("someone"));
        assert_eq!(result.content.as_deref(), Some("Body text here"));
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["subreddit"], "rust");
        assert_eq!(metadata["topComments"].as_array().unwrap().len(), 2);
        assert_eq!(metadata["topComments"][1]["author"], "b");
    }

    #[test]
    fn reddit_link_post_falls_back_to_url() {
        let data = serde_json::json!([
            {"data": {"children": [{"data": {
                "title": "Link post",
                "author": "x",
                "selftext": "",
                "url": "https://linked.example.com",
                "subreddit": "rust",
                "score": 1,
                "num_comments": 0
            }}]}}
        ]);
        let result = parse_reddit_listing("https://reddit.com/r/rust/2", &data);
        assert_eq!(result.content.as_deref(), Some("https://linked.example.com"));
    }

    #[test]
    fn reddit_bad_shape_is_error() {
        let result = parse_reddit_listing("https://reddit.com/x", &serde_json::json!({}));
        assert!(result.error.unwrap().contains("Unexpected"));
    }

    // ── html helpers ──

    #[test]
    fn title_extracted_from_html() {
        assert_eq!(
            extract_title("<html><head><title> My Page </title></head></html>"),
            Some("My Page".into())
        );
        assert_eq!(extract_title("<html><body>no title</body></html>"), None);
    }

    #[test]
    fn strip_html_removes_scripts_and_tags() {
        let html = "<html><script>alert('x');</script><style>p{}</style>\
                    <p>Hello <b>world</b> &amp; friends</p></html>";
        let text = strip_html(html);
        assert!(text.contains("Hello world & friends"));
        assert!(!text.contains("alert"));
        assert!(!text.contains('<'));
    }
}
