//! Fetch command — run the content extractor against one URL.

use anyhow::Result;

use quill_content::ContentFetcher;

pub async fn run(url: &str, as_json: bool) -> Result<()> {
    let fetcher = ContentFetcher::new();
    let result = fetcher.fetch(url).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Platform: {}", result.platform);
    println!("Title: {}", result.title.as_deref().unwrap_or("N/A"));
    println!("Author: {}", result.author.as_deref().unwrap_or("N/A"));
    if let Some(error) = &result.error {
        println!("Error: {error}");
    }
    if let Some(content) = &result.content {
        let preview: String = content.chars().take(500).collect();
        println!("\nContent preview:\n{preview}");
    }
    if let Some(transcript) = &result.transcript {
        let preview: String = transcript.chars().take(1000).collect();
        println!("\nTranscript ({} chars):\n{preview}", transcript.len());
    }
    Ok(())
}
