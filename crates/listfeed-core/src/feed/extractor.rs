use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dates::parse_date;
use super::models::Post;
use crate::config::{AppConfig, ExtractConfig};
use crate::{Error, Result};

/// Pulls post records out of a listing page using configured CSS selectors
pub struct ListingExtractor {
    item: Selector,
    title: Selector,
    link: Selector,
    date: Selector,
    summary: Selector,
    item_selector: String,
    link_filter: Option<String>,
    base: Url,
}

fn compile(kind: &str, raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid {} selector {:?}: {}", kind, raw, e)))
}

/// Concatenated text content with whitespace collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ListingExtractor {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_selectors(&config.extract, config.base_url()?)
    }

    pub fn with_selectors(selectors: &ExtractConfig, base: Url) -> Result<Self> {
        Ok(Self {
            item: compile("item", &selectors.item_selector)?,
            title: compile("title", &selectors.title_selector)?,
            link: compile("link", &selectors.link_selector)?,
            date: compile("date", &selectors.date_selector)?,
            summary: compile("summary", &selectors.summary_selector)?,
            item_selector: selectors.item_selector.clone(),
            link_filter: selectors.link_filter.clone().filter(|f| !f.is_empty()),
            base,
        })
    }

    /// Extract posts in page order, dropping repeated links
    ///
    /// Fails when the listing structure is missing entirely or when no block
    /// yields a usable post.
    pub fn extract(&self, html: &str) -> Result<Vec<Post>> {
        let document = Html::parse_document(html);

        let mut posts = Vec::new();
        let mut seen = HashSet::new();
        let mut blocks = 0usize;

        for block in document.select(&self.item) {
            blocks += 1;
            match self.extract_block(block) {
                Some(post) => {
                    if seen.insert(post.link.clone()) {
                        posts.push(post);
                    } else {
                        tracing::debug!("Skipping duplicate post link: {}", post.link);
                    }
                }
                None => tracing::debug!("Skipping listing block {} without title or link", blocks),
            }
        }

        if blocks == 0 {
            return Err(Error::Extract(format!(
                "no element matches item selector {:?}; the page layout may have changed",
                self.item_selector
            )));
        }
        if posts.is_empty() {
            return Err(Error::Extract(format!(
                "{} listing blocks matched {:?} but none contained a titled link",
                blocks, self.item_selector
            )));
        }

        tracing::debug!("Extracted {} posts from {} listing blocks", posts.len(), blocks);
        Ok(posts)
    }

    fn extract_block(&self, block: ElementRef<'_>) -> Option<Post> {
        // Cards are often the anchor themselves
        let (anchor, link) = std::iter::once(block)
            .filter(|el| self.link.matches(el))
            .chain(block.select(&self.link))
            .find_map(|el| {
                el.value()
                    .attr("href")
                    .and_then(|href| self.resolve_link(href))
                    .map(|link| (el, link))
            })?;

        let title = block
            .select(&self.title)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| Some(element_text(anchor)).filter(|t| !t.is_empty()))?;

        let published = block.select(&self.date).find_map(|el| {
            el.value()
                .attr("datetime")
                .and_then(parse_date)
                .or_else(|| parse_date(&element_text(el)))
        });

        let summary = block
            .select(&self.summary)
            .map(element_text)
            .find(|s| !s.is_empty() && *s != title);

        Some(Post {
            title,
            link,
            published,
            summary,
        })
    }

    /// Resolve an href against the base URL, rejecting non-page links
    fn resolve_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let mut url = self.base.join(href).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_fragment(None);

        let link = url.to_string();
        match self.link_filter {
            Some(ref filter) if !link.contains(filter.as_str()) => None,
            _ => Some(link),
        }
    }
}
