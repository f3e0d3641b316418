pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod service;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use http::FeedServer;
pub use service::FeedService;
