//! Outbound formatting — Markdown → Telegram HTML, and chunking for
//! transports with a message-length cap.

use regex::Regex;

/// Convert LLM-style Markdown to the HTML subset Telegram accepts.
///
/// Code spans are protected first so their contents survive untouched; if
/// Telegram still rejects the HTML, the caller falls back to plain text.
pub fn markdown_to_telegram_html(text: &str) -> String {
    // Protect fenced code blocks, then inline code, behind placeholders.
    let mut fenced: Vec<String> = Vec::new();
    let re_fence = Regex::new(r"(?s)```(?:\w+)?\n?(.*?)```").expect("valid regex");
    let text = re_fence.replace_all(text, |caps: &regex::Captures| {
        fenced.push(caps[1].to_string());
        format!("\u{0}F{}\u{0}", fenced.len() - 1)
    });

    let mut inline: Vec<String> = Vec::new();
    let re_inline = Regex::new(r"`([^`]+)`").expect("valid regex");
    let text = re_inline.replace_all(&text, |caps: &regex::Captures| {
        inline.push(caps[1].to_string());
        format!("\u{0}I{}\u{0}", inline.len() - 1)
    });

    // Headers and blockquotes flatten to plain lines.
    let re_header = Regex::new(r"(?m)^#{1,6}\s+(.+)$").expect("valid regex");
    let text = re_header.replace_all(&text, "$1");
    let re_quote = Regex::new(r"(?m)^>\s?(.*)$").expect("valid regex");
    let text = re_quote.replace_all(&text, "$1");

    // Escape before inserting our own tags.
    let text = escape_html(&text);

    let re_link = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex");
    let text = re_link.replace_all(&text, r#"<a href="$2">$1</a>"#);

    let re_bold = Regex::new(r"\*\*(.+?)\*\*").expect("valid regex");
    let text = re_bold.replace_all(&text, "<b>$1</b>");

    // _italic_ guarded against snake_case (no lookbehind in the regex crate,
    // so the neighbors are captured and restored).
    let re_italic =
        Regex::new(r"(^|[^A-Za-z0-9_])_([^_\n]+)_($|[^A-Za-z0-9_])").expect("valid regex");
    let text = re_italic.replace_all(&text, "$1<i>$2</i>$3");

    let re_strike = Regex::new(r"~~(.+?)~~").expect("valid regex");
    let text = re_strike.replace_all(&text, "<s>$1</s>");

    let re_bullet = Regex::new(r"(?m)^\s*[-*]\s+").expect("valid regex");
    let mut text = re_bullet.replace_all(&text, "• ").to_string();

    // Restore protected code with proper escaping.
    for (i, code) in inline.iter().enumerate() {
        text = text.replace(
            &format!("\u{0}I{i}\u{0}"),
            &format!("<code>{}</code>", escape_html(code)),
        );
    }
    for (i, code) in fenced.iter().enumerate() {
        text = text.replace(
            &format!("\u{0}F{i}\u{0}"),
            &format!("<pre><code>{}</code></pre>", escape_html(code)),
        );
    }

    text
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Split text into chunks of at most `max_len` bytes, preferring newline
/// boundaries and hard-splitting (at char boundaries) only when a single
/// line overflows the cap.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if !current.is_empty() && current.len() + line.len() > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() > max_len {
            let mut rest = line;
            while rest.len() > max_len {
                let mut cut = max_len;
                while !rest.is_char_boundary(cut) {
                    cut -= 1;
                }
                chunks.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current.push_str(rest);
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic() {
        let html = markdown_to_telegram_html("**strong** and _soft_ words");
        assert!(html.contains("<b>strong</b>"));
        assert!(html.contains("<i>soft</i>"));
    }

    #[test]
    fn snake_case_is_not_italicized() {
        let html = markdown_to_telegram_html("call send_file or read_file");
        assert!(!html.contains("<i>"));
    }

    #[test]
    fn inline_code_is_escaped() {
        let html = markdown_to_telegram_html("use `a < b` here");
        assert!(html.contains("<code>a &lt; b</code>"));
    }

    #[test]
    fn fenced_code_survives_untouched() {
        let html = markdown_to_telegram_html("```rust\nlet x = 1 && 2;\n```");
        assert!(html.contains("<pre><code>let x = 1 &amp;&amp; 2;\n</code></pre>"));
        // markdown inside code must not become tags
        let html = markdown_to_telegram_html("```\n**not bold**\n```");
        assert!(html.contains("**not bold**"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn links_become_anchors() {
        let html = markdown_to_telegram_html("see [docs](https://example.com)");
        assert!(html.contains(r#"<a href="https://example.com">docs</a>"#));
    }

    #[test]
    fn headers_flatten_and_bullets_convert() {
        let html = markdown_to_telegram_html("# Title\n- first\n* second");
        assert!(html.contains("Title"));
        assert!(!html.contains('#'));
        assert!(html.contains("• first"));
        assert!(html.contains("• second"));
    }

    #[test]
    fn ampersand_is_escaped() {
        let html = markdown_to_telegram_html("this & that");
        assert_eq!(html, "this &amp; that");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_message("hello", 4096), vec!["hello"]);
    }

    #[test]
    fn splits_prefer_newlines() {
        let text = format!("{}\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = split_message(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn oversized_line_is_hard_split() {
        let text = "x".repeat(250);
        let chunks = split_message(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn every_chunk_respects_cap() {
        let text = "line one\n".repeat(100) + &"y".repeat(500);
        for chunk in split_message(&text, 120) {
            assert!(chunk.len() <= 120);
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(300); // 2 bytes each
        for chunk in split_message(&text, 101) {
            assert!(chunk.len() <= 101);
            assert!(std::str::from_utf8(chunk.as_bytes()).is_ok());
        }
    }
}
