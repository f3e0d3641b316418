use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use listfeed_core::{AppConfig, FeedServer, FeedService};

/// Run the HTTP server until Ctrl+C
pub async fn run(config: Arc<AppConfig>) -> Result<()> {
    let service = Arc::new(FeedService::new(&config)?);
    let server = FeedServer::bind(service, config.bind_addr()?).await?;

    info!(
        "Serving {} (cache: {}, ttl: {}s, max items: {})",
        config.source.list_url,
        config.cache_path().display(),
        config.cache.ttl_secs,
        config.feed.max_items
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    server.run(shutdown_rx).await?;
    Ok(())
}
