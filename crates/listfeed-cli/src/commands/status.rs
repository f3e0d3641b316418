use anyhow::Result;
use chrono::Utc;

use listfeed_core::cache::{is_fresh, CacheStore};
use listfeed_core::AppConfig;

/// Show the cached snapshot and whether it is still fresh
pub async fn run(config: &AppConfig) -> Result<()> {
    let store = CacheStore::from_config(config);
    println!("Cache file: {}", store.path().display());

    match store.read().await? {
        Some(entry) => {
            let now = Utc::now();
            let state = if is_fresh(&entry, config.cache_ttl(), now) {
                "fresh"
            } else {
                "stale"
            };
            println!("Fetched at: {}", entry.fetched_at.to_rfc3339());
            println!(
                "Age:        {}s (ttl {}s, {})",
                entry.age(now).as_secs(),
                config.cache.ttl_secs,
                state
            );
            println!("Posts:      {}", entry.posts.len());
        }
        None => {
            println!("No cached snapshot yet.");
        }
    }

    Ok(())
}
