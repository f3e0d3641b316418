use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Client, Proxy};

use crate::config::AppConfig;
use crate::{Error, Result};

const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 10;

/// Source of raw page markup
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` once and return its body as text
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher for the listing page and post pages
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Create a new page fetcher with configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Self::build_client(
            config.request_timeout(),
            &config.source.user_agent,
            &config.source.proxy_url,
        )?;
        Ok(Self { client })
    }

    /// Build HTTP client with identifying headers and optional proxy
    fn build_client(
        timeout: Duration,
        user_agent: &str,
        proxy_url: &Option<String>,
    ) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .default_headers(Self::build_headers(user_agent)?)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(ref proxy) = proxy_url {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for page fetching");
        }

        builder.build().map_err(Error::Http)
    }

    fn build_headers(user_agent: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        let ua = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::Config(format!("Invalid User-Agent {:?}: {}", user_agent, e)))?;
        headers.insert(USER_AGENT, ua);
        Ok(headers)
    }

    /// Check if content is a Cloudflare challenge page
    fn is_cloudflare_challenge(content: &[u8]) -> bool {
        // Markers live in the first 2KB
        let check_len = content.len().min(2048);
        let preview = String::from_utf8_lossy(&content[..check_len]);

        preview.contains("Just a moment...")
            || preview.contains("cf-browser-verification")
            || preview.contains("_cf_chl_opt")
            || preview.contains("challenge-platform")
    }

    fn ensure_content_size(size: usize, url: &str) -> Result<()> {
        if size > MAX_PAGE_BYTES {
            return Err(Error::Fetch(format!(
                "Page too large ({} bytes) for URL: {}",
                size, url
            )));
        }
        Ok(())
    }

    /// Decode a body with the charset named in its Content-Type, else UTF-8
    ///
    /// A byte order mark overrides the header, as browsers do.
    fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
        let encoding = content_type
            .and_then(|ct| {
                ct.split(';').skip(1).find_map(|param| {
                    let (key, value) = param.split_once('=')?;
                    key.trim()
                        .eq_ignore_ascii_case("charset")
                        .then(|| value.trim().trim_matches('"'))
                })
            })
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);

        let (text, _, _) = encoding.decode(body);
        text.into_owned()
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching page: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            Self::ensure_content_size(len as usize, url)?;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body: Bytes = response.bytes().await?;
        Self::ensure_content_size(body.len(), url)?;

        if Self::is_cloudflare_challenge(&body) {
            return Err(Error::Fetch(format!(
                "Cloudflare JavaScript challenge detected for URL: {}. \
                The site requires browser verification; try a proxy.",
                url
            )));
        }

        Ok(Self::decode_body(&body, content_type.as_deref()))
    }
}
