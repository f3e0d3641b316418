use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::models::{ChannelMeta, Post};
use crate::{Error, Result};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

type XmlWriter = Writer<Vec<u8>>;

fn write_event(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Render(e.to_string()))
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_item(writer: &mut XmlWriter, post: &Post) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new("item")))?;
    text_element(writer, "title", &post.title)?;
    text_element(writer, "link", &post.link)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    write_event(writer, Event::Start(guid))?;
    write_event(writer, Event::Text(BytesText::new(&post.link)))?;
    write_event(writer, Event::End(BytesEnd::new("guid")))?;

    if let Some(published) = post.published {
        text_element(writer, "pubDate", &published.to_rfc2822())?;
    }
    if let Some(ref summary) = post.summary {
        text_element(writer, "description", summary)?;
    }
    write_event(writer, Event::End(BytesEnd::new("item")))
}

/// Render posts as an RSS 2.0 document
///
/// At most `max_items` posts are emitted, in input order. Optional post fields
/// are left out of the item rather than written empty.
pub fn render_rss(
    channel: &ChannelMeta,
    posts: &[Post],
    max_items: usize,
    last_build: Option<DateTime<Utc>>,
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    if channel.self_link.is_some() {
        rss.push_attribute(("xmlns:atom", ATOM_NS));
    }
    write_event(&mut writer, Event::Start(rss))?;
    write_event(&mut writer, Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &channel.title)?;
    text_element(&mut writer, "link", &channel.link)?;
    text_element(&mut writer, "description", &channel.description)?;
    if let Some(ref language) = channel.language {
        text_element(&mut writer, "language", language)?;
    }
    if let Some(ref self_link) = channel.self_link {
        let mut atom_link = BytesStart::new("atom:link");
        atom_link.push_attribute(("href", self_link.as_str()));
        atom_link.push_attribute(("rel", "self"));
        atom_link.push_attribute(("type", "application/rss+xml"));
        write_event(&mut writer, Event::Empty(atom_link))?;
    }
    if let Some(built) = last_build {
        text_element(&mut writer, "lastBuildDate", &built.to_rfc2822())?;
    }
    text_element(
        &mut writer,
        "generator",
        concat!("listfeed ", env!("CARGO_PKG_VERSION")),
    )?;

    for post in posts.iter().take(max_items) {
        write_item(&mut writer, post)?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("channel")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn channel() -> ChannelMeta {
        ChannelMeta {
            title: "Example Blog".to_string(),
            link: "https://blog.example.com/news".to_string(),
            description: "Scraped posts".to_string(),
            language: Some("en".to_string()),
            self_link: None,
        }
    }

    fn post(title: &str) -> Post {
        Post::new(title, format!("https://blog.example.com/news/{}", title.to_lowercase()))
    }

    fn parse(xml: &str) -> feed_rs::model::Feed {
        feed_rs::parser::parse(xml.as_bytes()).expect("rendered feed should parse")
    }

    #[test]
    fn test_cap_preserves_order() {
        let posts = vec![post("A"), post("B"), post("C")];
        let xml = render_rss(&channel(), &posts, 2, None).unwrap();

        let feed = parse(&xml);
        let titles: Vec<_> = feed
            .entries
            .iter()
            .map(|e| e.title.as_ref().unwrap().content.clone())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_item_count_never_exceeds_cap() {
        let posts: Vec<_> = (0..30).map(|i| post(&format!("P{}", i))).collect();
        for cap in [0, 1, 5, 30, 100] {
            let xml = render_rss(&channel(), &posts, cap, None).unwrap();
            assert_eq!(xml.matches("<item>").count(), cap.min(posts.len()));
        }
    }

    #[test]
    fn test_zero_posts_is_valid_rss() {
        let xml = render_rss(&channel(), &[], 20, None).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(!xml.contains("<item>"));

        let feed = parse(&xml);
        assert!(feed.entries.is_empty());
        assert_eq!(feed.title.unwrap().content, "Example Blog");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let mut full = post("Full");
        full.published = Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());
        full.summary = Some("Has a summary".to_string());
        let bare = post("Bare");

        let xml = render_rss(&channel(), &[full, bare], 10, None).unwrap();

        // channel description + one item description
        assert_eq!(xml.matches("<description>").count(), 2);
        assert_eq!(xml.matches("<pubDate>").count(), 1);
        assert!(!xml.contains("<description></description>"));
        assert!(xml.contains("Mar 2024 09:00:00 +0000</pubDate>"));

        let feed = parse(&xml);
        assert_eq!(feed.entries.len(), 2);
        assert!(feed.entries[0].published.is_some());
        assert!(feed.entries[1].published.is_none());
        assert!(feed.entries[1].summary.is_none());
    }

    #[test]
    fn test_text_is_escaped() {
        let mut p = post("Escaped");
        p.title = "Tom & Jerry <3".to_string();
        p.summary = Some("<b>bold</b> claims".to_string());

        let xml = render_rss(&channel(), &[p], 10, None).unwrap();
        assert!(xml.contains("Tom &amp; Jerry &lt;3"));

        let feed = parse(&xml);
        assert_eq!(feed.entries[0].title.as_ref().unwrap().content, "Tom & Jerry <3");
    }

    #[test]
    fn test_self_link_and_build_date() {
        let mut meta = channel();
        meta.self_link = Some("https://feeds.lan/feed.xml".to_string());
        let built = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();

        let xml = render_rss(&meta, &[post("A")], 10, Some(built)).unwrap();
        assert!(xml.contains(r#"xmlns:atom="http://www.w3.org/2005/Atom""#));
        assert!(xml.contains(r#"<atom:link href="https://feeds.lan/feed.xml" rel="self" type="application/rss+xml"/>"#));
        assert!(xml.contains(&format!("<lastBuildDate>{}</lastBuildDate>", built.to_rfc2822())));

        let feed = parse(&xml);
        assert_eq!(feed.entries.len(), 1);
    }

    #[test]
    fn test_guid_is_permalink() {
        let xml = render_rss(&channel(), &[post("A")], 10, None).unwrap();
        assert!(xml.contains(
            r#"<guid isPermaLink="true">https://blog.example.com/news/a</guid>"#
        ));
    }
}
