use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use super::routes::build_router;
use crate::service::FeedService;
use crate::Result;

/// HTTP server bound to a listening socket
pub struct FeedServer {
    service: Arc<FeedService>,
    listener: TcpListener,
}

impl FeedServer {
    /// Bind the listening socket
    pub async fn bind(service: Arc<FeedService>, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { service, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests until the shutdown signal flips to true
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = self.local_addr()?;
        info!("HTTP server listening on http://{}/feed.xml", addr);

        let router = build_router(self.service);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                while shutdown_rx.changed().await.is_ok() {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::service::testing::FakeSource;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_serves_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.cache.file = dir.path().join("cache.json");

        let source = Arc::new(FakeSource::failing());
        let service = Arc::new(FeedService::with_source(&config, source).unwrap());
        let server = FeedServer::bind(service, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(server.run(shutdown_rx));

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let body = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, r#"{"ok":true}"#);

        shutdown_tx.send(true).unwrap();
        let result = timeout(Duration::from_secs(5), handle)
            .await
            .expect("server should stop after shutdown signal")
            .unwrap();
        assert!(result.is_ok());
    }
}
