//! Fetch → extract → cache → render pipeline.
//!
//! Refresh is lazy: a request that finds the cache stale refreshes it. If the
//! refresh fails, the previous snapshot is served instead of an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{is_fresh, CacheEntry, CacheStore};
use crate::config::AppConfig;
use crate::feed::{
    enrich_posts, render_rss, ChannelMeta, FeedSnapshot, ListingExtractor, PageFetcher, PageSource,
    Post,
};
use crate::{Error, Result};

pub struct FeedService {
    source: Arc<dyn PageSource>,
    extractor: ListingExtractor,
    store: CacheStore,
    list_url: String,
    ttl: Duration,
    max_items: usize,
    enrich: bool,
    channel: ChannelMeta,
    /// Held while refreshing; holds the error of the last failed attempt
    refresh_lock: Mutex<Option<String>>,
    /// Completed refresh attempts
    attempts: AtomicU64,
}

impl FeedService {
    /// Build the service with the HTTP fetcher
    pub fn new(config: &AppConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(config)?;
        Self::with_source(config, Arc::new(fetcher))
    }

    /// Build the service around any page source
    pub fn with_source(config: &AppConfig, source: Arc<dyn PageSource>) -> Result<Self> {
        Ok(Self {
            source,
            extractor: ListingExtractor::new(config)?,
            store: CacheStore::from_config(config),
            list_url: config.source.list_url.clone(),
            ttl: config.cache_ttl(),
            max_items: config.feed.max_items,
            enrich: config.source.enrich,
            channel: config.channel_meta(),
            refresh_lock: Mutex::new(None),
            attempts: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Posts to serve at `now`, refreshing the cache first if it is stale
    ///
    /// At most one refresh runs at a time. A request that finds a refresh in
    /// progress serves the stale entry at once; one without any cache waits
    /// for that refresh and shares its outcome instead of fetching again.
    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> Result<FeedSnapshot> {
        let cached = self.read_cache().await;
        if let Some(entry) = cached.as_ref() {
            if is_fresh(entry, self.ttl, now) {
                debug!("Serving fresh cache ({} posts)", entry.posts.len());
                return Ok(fresh_snapshot(entry.clone()));
            }
        }

        let seen_attempts = self.attempts.load(Ordering::SeqCst);
        let mut last_failure = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => match cached {
                Some(entry) => {
                    debug!("Refresh already in progress, serving stale cache");
                    return Ok(stale_snapshot(entry));
                }
                None => self.refresh_lock.lock().await,
            },
        };

        // Another request may have refreshed while we waited
        let cached = self.read_cache().await;
        if let Some(entry) = cached.as_ref() {
            if is_fresh(entry, self.ttl, now) {
                debug!("Cache refreshed by a concurrent request");
                return Ok(fresh_snapshot(entry.clone()));
            }
        }

        if self.attempts.load(Ordering::SeqCst) != seen_attempts {
            if let Some(entry) = cached {
                return Ok(stale_snapshot(entry));
            }
            if let Some(message) = last_failure.as_ref() {
                return Err(Error::Fetch(format!("Refresh failed: {}", message)));
            }
        }

        let result = self.refresh_at(now).await;
        *last_failure = result.as_ref().err().map(|e| e.to_string());
        self.attempts.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(entry) => Ok(fresh_snapshot(entry)),
            Err(e) => match cached {
                Some(entry) => {
                    warn!(
                        "Refresh failed, serving stale cache from {}: {}",
                        entry.fetched_at, e
                    );
                    Ok(stale_snapshot(entry))
                }
                None => Err(e),
            },
        }
    }

    pub async fn snapshot(&self) -> Result<FeedSnapshot> {
        self.snapshot_at(Utc::now()).await
    }

    /// Fetch and extract unconditionally, then store the result
    ///
    /// A failed cache write is logged; the fresh entry is still returned.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<CacheEntry> {
        info!("Refreshing posts from {}", self.list_url);

        let posts = self.fetch_posts().await?;
        let entry = CacheEntry::new(posts, now);

        if let Err(e) = self.store.write(&entry).await {
            warn!("Failed to write cache: {}", e);
        }

        info!("Refreshed {} posts", entry.posts.len());
        Ok(entry)
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let html = self.source.fetch_page(&self.list_url).await?;
        let mut posts = self.extractor.extract(&html)?;
        if self.enrich {
            enrich_posts(self.source.as_ref(), &mut posts, self.max_items).await;
        }
        Ok(posts)
    }

    pub fn render_snapshot(&self, snapshot: &FeedSnapshot) -> Result<String> {
        render_rss(
            &self.channel,
            &snapshot.posts,
            self.max_items,
            Some(snapshot.fetched_at),
        )
    }

    async fn read_cache(&self) -> Option<CacheEntry> {
        match self.store.read().await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache unreadable, treating as empty: {}", e);
                None
            }
        }
    }
}

fn fresh_snapshot(entry: CacheEntry) -> FeedSnapshot {
    FeedSnapshot {
        posts: entry.posts,
        fetched_at: entry.fetched_at,
        stale: false,
    }
}

fn stale_snapshot(entry: CacheEntry) -> FeedSnapshot {
    FeedSnapshot {
        posts: entry.posts,
        fetched_at: entry.fetched_at,
        stale: true,
    }
}
