use anyhow::Result;
use chrono::Utc;

use listfeed_core::{AppConfig, FeedService};

/// Fetch the listing regardless of cache age
pub async fn run(config: &AppConfig) -> Result<()> {
    let service = FeedService::new(config)?;

    println!("Fetching {}...", config.source.list_url);
    let entry = service.refresh_at(Utc::now()).await?;

    println!(
        "Cached {} posts in {}",
        entry.posts.len(),
        service.store().path().display()
    );
    for post in entry.posts.iter().take(config.feed.max_items) {
        let date = post
            .published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!("  {}  {}", date, post.title);
    }
    if entry.posts.len() > config.feed.max_items {
        println!(
            "  ... {} more not included in the feed (max_items = {})",
            entry.posts.len() - config.feed.max_items,
            config.feed.max_items
        );
    }

    Ok(())
}
