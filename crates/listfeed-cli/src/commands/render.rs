use anyhow::Result;

use listfeed_core::{AppConfig, FeedService};

/// Print the feed, refreshing the cache first if it is stale
pub async fn run(config: &AppConfig) -> Result<()> {
    let service = FeedService::new(config)?;
    let snapshot = service.snapshot().await?;

    if snapshot.stale {
        eprintln!(
            "Warning: refresh failed, serving posts cached at {}",
            snapshot.fetched_at.to_rfc3339()
        );
    }

    println!("{}", service.render_snapshot(&snapshot)?);
    Ok(())
}
