//! Fill in missing post fields from each post's own page.
//!
//! Listing cards often omit the date or teaser; the post page usually carries
//! both in its `<meta>` tags.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

use super::dates::parse_date;
use super::extractor::element_text;
use super::fetcher::PageSource;
use super::models::Post;

const SUMMARY_META: &[&str] = &["og:description", "description"];
const DATE_META: &[&str] = &["article:published_time", "og:updated_time", "date"];

/// Metadata found on a post page
#[derive(Debug, Default, PartialEq)]
pub struct PageMeta {
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

fn meta_content(document: &Html, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        let raw = format!(r#"meta[property="{0}"], meta[name="{0}"]"#, name);
        let selector = Selector::parse(&raw).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|c| !c.is_empty())
    })
}

/// Read summary and publish date from a post page
pub fn parse_page_meta(html: &str) -> PageMeta {
    let document = Html::parse_document(html);

    let summary = meta_content(&document, SUMMARY_META);

    let published = meta_content(&document, DATE_META)
        .and_then(|raw| parse_date(&raw))
        .or_else(|| {
            let selector = Selector::parse("time[datetime], time").ok()?;
            document.select(&selector).find_map(|el| {
                el.value()
                    .attr("datetime")
                    .and_then(parse_date)
                    .or_else(|| parse_date(&element_text(el)))
            })
        });

    PageMeta { summary, published }
}

/// Fetch the pages of the first `limit` incomplete posts and fill the gaps
///
/// A failed or unhelpful page leaves its post unchanged.
pub async fn enrich_posts(source: &dyn PageSource, posts: &mut [Post], limit: usize) {
    for post in posts.iter_mut().take(limit) {
        if !post.is_incomplete() {
            continue;
        }

        let html = match source.fetch_page(&post.link).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Skipping enrichment for {}: {}", post.link, e);
                continue;
            }
        };

        let meta = parse_page_meta(&html);
        if post.summary.is_none() {
            post.summary = meta.summary;
        }
        if post.published.is_none() {
            post.published = meta.published;
        }
    }
}
