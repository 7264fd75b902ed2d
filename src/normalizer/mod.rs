use std::sync::OnceLock;

use feed_rs::model::Link;
use feed_rs::parser;
use html_escape::decode_html_entities;
use regex::Regex;

use crate::app::{EstuaryError, Result};
use crate::domain::Item;
use crate::registry::Source;

/// Feed-level fields plus every entry, before any filtering.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub link: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// One entry as delivered by the source. Every field is optional here;
/// normalization decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub link: Option<String>,
    pub title: Option<String>,
    /// Summary or content body, still containing markup.
    pub description: Option<String>,
    /// Unix seconds.
    pub published: Option<i64>,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse RSS, Atom or JSON Feed bytes.
    pub fn parse(&self, body: &[u8]) -> Result<ParsedFeed> {
        let feed = parser::parse(body).map_err(|e| EstuaryError::FeedParse(e.to_string()))?;

        let entries = feed
            .entries
            .into_iter()
            .map(|entry| RawEntry {
                link: primary_link(&entry.links),
                title: entry.title.map(|t| t.content),
                description: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body)),
                published: entry.published.or(entry.updated).map(|dt| dt.timestamp()),
            })
            .collect();

        Ok(ParsedFeed {
            title: feed
                .title
                .map(|t| decode_html_entities(t.content.trim()).to_string())
                .filter(|t| !t.is_empty()),
            link: primary_link(&feed.links),
            entries,
        })
    }

    /// Turn one entry into an item, or `None` when it lacks a link or title.
    ///
    /// `now` is the ingestion time; callers pass the same value for a whole
    /// batch so that its items tie on `added`.
    pub fn normalize_entry(&self, source: &Source, entry: &RawEntry, now: i64) -> Option<Item> {
        let link = entry.link.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
        let title = entry
            .title
            .as_deref()
            .map(|t| decode_html_entities(t.trim()).to_string())
            .filter(|t| !t.is_empty())?;

        let description = entry
            .description
            .as_deref()
            .map(strip_html)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| title.clone());

        let mut item = Item::new(&source.id, &source.group, link, &title, now);
        item.description = description;
        item.published = entry.published.unwrap_or(now);
        Some(item)
    }

    /// Normalize a batch, skipping unusable entries.
    pub fn normalize(&self, source: &Source, entries: &[RawEntry], now: i64) -> Vec<Item> {
        entries
            .iter()
            .filter_map(|entry| {
                let item = self.normalize_entry(source, entry, now);
                if item.is_none() {
                    tracing::debug!("Skipping entry without link or title from {}", source.url);
                }
                item
            })
            .collect()
    }
}

/// First link marked `alternate` (or unmarked), else the first link at all.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^<]+?>").expect("tag pattern is valid"))
}

/// Remove markup, decode entities and collapse whitespace.
///
/// Tags are stripped again after decoding: markup escaped twice upstream
/// only becomes visible once the entities are gone.
pub fn strip_html(html: &str) -> String {
    let without_tags = tag_pattern().replace_all(html, " ");
    let decoded = decode_html_entities(&without_tags);
    let text = tag_pattern().replace_all(&decoded, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com/</link>
    <description>A test feed</description>
    <item>
      <title>Test Item 1</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>&lt;p&gt;Hello &amp;amp; &lt;b&gt;world&lt;/b&gt;&lt;/p&gt;</description>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>https://example.com/item2</link>
      <guid>item-2</guid>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <link>https://example.com/untitled</link>
      <description>No title</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <link rel="self" href="https://example.com/feed.atom"/>
  <link rel="alternate" href="https://example.com/blog"/>
  <id>urn:example:feed</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Atom Entry 1</title>
    <link rel="alternate" href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    const NOW: i64 = 1_800_000_000;

    fn source() -> Source {
        Source::new("https://example.com/feed.xml", "news")
    }

    fn entry(link: Option<&str>, title: Option<&str>) -> RawEntry {
        RawEntry {
            link: link.map(String::from),
            title: title.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_rss() {
        let parsed = Normalizer::new().parse(RSS_SAMPLE.as_bytes()).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Test Feed"));
        assert_eq!(parsed.link.as_deref(), Some("https://example.com/"));
        assert_eq!(parsed.entries.len(), 4);
        assert_eq!(parsed.entries[0].published, Some(1_704_067_200));
        assert_eq!(parsed.entries[1].published, None);
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let parsed = Normalizer::new().parse(ATOM_SAMPLE.as_bytes()).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Atom Test Feed"));
        assert_eq!(parsed.link.as_deref(), Some("https://example.com/blog"));
        assert_eq!(
            parsed.entries[0].link.as_deref(),
            Some("https://example.com/atom1")
        );
        assert_eq!(parsed.entries[0].published, Some(1_704_067_200));
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(Normalizer::new().parse(b"this is not a feed").is_err());
    }

    #[test]
    fn test_normalize_skips_malformed_entries() {
        let normalizer = Normalizer::new();
        let parsed = normalizer.parse(RSS_SAMPLE.as_bytes()).unwrap();
        let items = normalizer.normalize(&source(), &parsed.entries, NOW);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Test Item 1");
        assert_eq!(items[0].description, "Hello & world");
        assert_eq!(items[0].published, 1_704_067_200);
        assert_eq!(items[0].feed_id, source().id);
        assert_eq!(items[0].group, "news");
    }

    #[test]
    fn test_batch_shares_added_and_falls_back_published() {
        let normalizer = Normalizer::new();
        let parsed = normalizer.parse(RSS_SAMPLE.as_bytes()).unwrap();
        let items = normalizer.normalize(&source(), &parsed.entries, NOW);

        assert!(items.iter().all(|i| i.added == NOW));
        assert_eq!(items[1].published, NOW);
    }

    #[test]
    fn test_id_depends_only_on_link() {
        let normalizer = Normalizer::new();
        let before = normalizer
            .normalize_entry(&source(), &entry(Some("https://example.com/a"), Some("Draft")), 1)
            .unwrap();
        let after = normalizer
            .normalize_entry(&source(), &entry(Some("https://example.com/a"), Some("Final")), 2)
            .unwrap();
        assert_eq!(before.id, after.id);
        assert_eq!(before.id, Item::generate_id("https://example.com/a"));
    }

    #[test]
    fn test_blank_link_or_title_dropped() {
        let normalizer = Normalizer::new();
        assert!(normalizer
            .normalize_entry(&source(), &entry(Some("  "), Some("Title")), NOW)
            .is_none());
        assert!(normalizer
            .normalize_entry(&source(), &entry(Some("https://example.com/a"), Some(" ")), NOW)
            .is_none());
        assert!(normalizer
            .normalize_entry(&source(), &entry(None, None), NOW)
            .is_none());
    }

    #[test]
    fn test_description_falls_back_to_title() {
        let normalizer = Normalizer::new();
        let item = normalizer
            .normalize_entry(&source(), &entry(Some("https://example.com/a"), Some("Only title")), NOW)
            .unwrap();
        assert_eq!(item.description, "Only title");

        let mut markup_only = entry(Some("https://example.com/b"), Some("Pic"));
        markup_only.description = Some("<img src=\"x.png\"/>".into());
        let item = normalizer.normalize_entry(&source(), &markup_only, NOW).unwrap();
        assert_eq!(item.description, "Pic");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>One</p>\n<p>Two &lt;3</p>"), "One Two <3");
        assert_eq!(strip_html("plain"), "plain");
        assert_eq!(strip_html("a<br/>b"), "a b");
    }

    #[test]
    fn test_double_escaped_markup_is_stripped() {
        assert_eq!(strip_html("&lt;b&gt;bold&lt;/b&gt; text"), "bold text");

        let body = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>
<item><title>Escaped</title><link>https://example.com/e</link>
<description>&amp;lt;p&amp;gt;Hello &amp;lt;b&amp;gt;bold&amp;lt;/b&amp;gt;&amp;lt;/p&amp;gt;</description></item>
</channel></rss>"#;
        let normalizer = Normalizer::new();
        let parsed = normalizer.parse(body.as_bytes()).unwrap();
        let items = normalizer.normalize(&source(), &parsed.entries, NOW);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Hello bold");
        assert!(!items[0].description.contains('<'));
    }
}
