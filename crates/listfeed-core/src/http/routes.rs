use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::service::FeedService;
use crate::Error;

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Router serving the feed and the liveness probe
pub fn build_router(service: Arc<FeedService>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/feed.xml", get(feed_xml))
        .layer(middleware::from_fn(log_requests))
        .with_state(service)
}

async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true}))
}

async fn feed_xml(State(service): State<Arc<FeedService>>) -> Response {
    let snapshot = match service.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => return error_response(e),
    };

    match service.render_snapshot(&snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: Error) -> Response {
    let status = if err.is_upstream() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error!("Feed unavailable ({}): {}", status, err);

    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("feed unavailable: {}\n", err),
    )
        .into_response()
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(%method, %uri, status = status.as_u16(), elapsed_ms, "request failed");
    } else {
        info!(%method, %uri, status = status.as_u16(), elapsed_ms, "request served");
    }
    response
}
