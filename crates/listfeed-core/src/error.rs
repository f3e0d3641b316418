use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for URL: {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Listing extraction failed: {0}")]
    Extract(String),

    #[error("Cache file error at {}: {}", path.display(), source)]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Feed rendering error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The upstream page could not be fetched (network, timeout, status, challenge)
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::UpstreamStatus { .. } | Error::Fetch(_)
        )
    }

    /// The listing structure was missing from the fetched page
    pub fn is_extract(&self) -> bool {
        matches!(self, Error::Extract(_))
    }

    /// Failure caused by the upstream site rather than by this process
    pub fn is_upstream(&self) -> bool {
        self.is_fetch() || self.is_extract()
    }

    pub(crate) fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::CacheIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
