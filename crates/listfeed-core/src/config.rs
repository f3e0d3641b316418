use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::feed::ChannelMeta;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where the listing page lives and how to fetch it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Blog listing page URL
    #[serde(default = "default_list_url")]
    pub list_url: String,
    /// Base for resolving relative post links (defaults to the listing URL)
    #[serde(default)]
    pub base_url: Option<String>,
    /// User-Agent sent with every upstream request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// HTTP proxy URL (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Fetch each post page to fill in a missing summary or date
    #[serde(default)]
    pub enrich: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
            base_url: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            proxy_url: None,
            enrich: false,
        }
    }
}

/// CSS selectors describing the repeating listing structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// One match per post block
    #[serde(default = "default_item_selector")]
    pub item_selector: String,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
    #[serde(default = "default_date_selector")]
    pub date_selector: String,
    #[serde(default = "default_summary_selector")]
    pub summary_selector: String,
    /// Only keep posts whose link contains this substring
    #[serde(default)]
    pub link_filter: Option<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            item_selector: default_item_selector(),
            title_selector: default_title_selector(),
            link_selector: default_link_selector(),
            date_selector: default_date_selector(),
            summary_selector: default_summary_selector(),
            link_filter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshot file path
    #[serde(default = "default_cache_file")]
    pub file: PathBuf,
    /// Seconds before the snapshot is considered stale
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: default_cache_file(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Channel metadata and item cap of the generated feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_title")]
    pub title: String,
    #[serde(default = "default_feed_description")]
    pub description: String,
    #[serde(default = "default_feed_language")]
    pub language: String,
    /// Public URL of /feed.xml, advertised as atom:link rel="self"
    #[serde(default)]
    pub self_link: Option<String>,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
            language: default_feed_language(),
            self_link: None,
            max_items: default_max_items(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_list_url() -> String {
    "https://teamtopologies.com/news-blogs-newsletters?category=Blog".to_string()
}

fn default_user_agent() -> String {
    format!("listfeed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    15
}

fn default_item_selector() -> String {
    "article".to_string()
}

fn default_title_selector() -> String {
    "h1, h2, h3".to_string()
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_date_selector() -> String {
    "time".to_string()
}

fn default_summary_selector() -> String {
    "p".to_string()
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("/data/cache.json")
}

fn default_cache_ttl() -> u64 {
    900 // 15 minutes
}

fn default_feed_title() -> String {
    "Blog (Unofficial RSS)".to_string()
}

fn default_feed_description() -> String {
    "Unofficial RSS feed generated by a local scraper.".to_string()
}

fn default_feed_language() -> String {
    "en".to_string()
}

fn default_max_items() -> usize {
    20
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

fn parse_env<T>(key: &str, value: &str) -> crate::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("{}={:?}: {}", key, value, e)))
}

fn parse_env_bool(key: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(crate::Error::Config(format!(
            "{}={:?}: expected a boolean",
            key, value
        ))),
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present), then apply environment overrides
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path` (defaults if the file does not exist),
    /// then apply environment overrides and validate
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    /// Always uses ~/.config/listfeed/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("listfeed")
            .join("config.toml")
    }

    /// Apply overrides from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BLOG_LIST_URL") {
            self.source.list_url = v;
        }
        if let Some(v) = lookup("BASE_URL") {
            self.source.base_url = Some(v);
        }
        if let Some(v) = lookup("USER_AGENT") {
            self.source.user_agent = v;
        }
        if let Some(v) = lookup("TIMEOUT") {
            // Fractional seconds ("15.0") are accepted and rounded up
            let secs: f64 = parse_env("TIMEOUT", &v)?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(crate::Error::Config(format!(
                    "TIMEOUT={:?}: must be a positive number of seconds",
                    v
                )));
            }
            self.source.timeout_secs = secs.ceil() as u64;
        }
        if let Some(v) = lookup("HTTP_PROXY_URL") {
            self.source.proxy_url = Some(v);
        }
        if let Some(v) = lookup("ENRICH_POSTS") {
            self.source.enrich = parse_env_bool("ENRICH_POSTS", &v)?;
        }
        if let Some(v) = lookup("MAX_ITEMS") {
            self.feed.max_items = parse_env("MAX_ITEMS", &v)?;
        }
        if let Some(v) = lookup("FEED_TITLE") {
            self.feed.title = v;
        }
        if let Some(v) = lookup("FEED_SELF_LINK") {
            self.feed.self_link = Some(v);
        }
        if let Some(v) = lookup("CACHE_TTL") {
            self.cache.ttl_secs = parse_env("CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("CACHE_FILE") {
            self.cache.file = PathBuf::from(v);
        }
        if let Some(v) = lookup("BIND_ADDR") {
            self.server.bind_addr = v;
        }
        Ok(())
    }

    /// Check the values that would otherwise only fail on first request
    pub fn validate(&self) -> crate::Result<()> {
        Url::parse(&self.source.list_url)
            .map_err(|e| crate::Error::Config(format!("list_url: {}", e)))?;
        if let Some(ref base) = self.source.base_url {
            Url::parse(base).map_err(|e| crate::Error::Config(format!("base_url: {}", e)))?;
        }
        if self.source.timeout_secs == 0 {
            return Err(crate::Error::Config("timeout_secs must be > 0".to_string()));
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Base URL relative post links are resolved against
    pub fn base_url(&self) -> crate::Result<Url> {
        let raw = self
            .source
            .base_url
            .as_deref()
            .unwrap_or(&self.source.list_url);
        Ok(Url::parse(raw)?)
    }

    pub fn bind_addr(&self) -> crate::Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| crate::Error::Config(format!("bind_addr: {}", e)))
    }

    /// Get the cache file path (with tilde expansion)
    pub fn cache_path(&self) -> PathBuf {
        expand_tilde(&self.cache.file)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    /// Channel metadata for the rendered feed
    pub fn channel_meta(&self) -> ChannelMeta {
        ChannelMeta {
            title: self.feed.title.clone(),
            link: self.source.list_url.clone(),
            description: self.feed.description.clone(),
            language: Some(self.feed.language.clone()),
            self_link: self.feed.self_link.clone(),
        }
    }
}
