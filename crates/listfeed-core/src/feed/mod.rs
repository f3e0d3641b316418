mod dates;
mod enrich;
mod extractor;
mod fetcher;
mod models;
mod render;

pub use dates::parse_date;
pub use enrich::{enrich_posts, parse_page_meta, PageMeta};
pub use extractor::ListingExtractor;
pub use fetcher::{PageFetcher, PageSource};
pub use models::{ChannelMeta, FeedSnapshot, Post};
pub use render::render_rss;
