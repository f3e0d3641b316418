use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post extracted from the listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    /// Absolute URL, unique within one extraction batch
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Post {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published: None,
            summary: None,
        }
    }

    /// True when a post page fetch could still add something
    pub fn is_incomplete(&self) -> bool {
        self.published.is_none() || self.summary.is_none()
    }
}

/// `<channel>` metadata of the generated feed
#[derive(Debug, Clone)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    /// Advertised as atom:link rel="self"
    pub self_link: Option<String>,
}

/// Posts handed to the renderer, with where they came from
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub fetched_at: DateTime<Utc>,
    /// A refresh failed and these posts come from the previous cache entry
    pub stale: bool,
}
