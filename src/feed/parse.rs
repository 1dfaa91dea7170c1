//! RSS channel parsing.

use super::{FeedError, RssItem};
use once_cell::sync::Lazy;
use quick_xml::{Reader, events::Event};
use regex::Regex;

static ANCHOR_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<a[^>]*>(.*?)</a>").expect("valid anchor regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Source,
    Description,
    Content,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            b"source" => Some(Field::Source),
            b"description" => Some(Field::Description),
            b"content:encoded" => Some(Field::Content),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    source: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

impl ItemBuilder {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::Source => &mut self.source,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
        };
        // First occurrence wins, matching how feeds list the primary value first.
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn build(self) -> RssItem {
        let raw = self.description.unwrap_or_default();
        RssItem {
            title: self.title,
            description: clean_description(&raw),
            link: self.link,
            pub_date: self.pub_date,
            source: self.source,
            content: self.content,
        }
    }
}

/// Parse the `<item>` elements of an RSS document.
///
/// An empty document or a channel without items yields no items; only
/// malformed XML is an error.
pub fn parse_rss(xml: &str) -> Result<Vec<RssItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                if name.as_ref() == b"item" {
                    current = Some(ItemBuilder::default());
                } else if current.is_some() && field.is_none() {
                    field = Field::from_name(name.as_ref());
                    text.clear();
                }
            },
            Event::Text(t) => {
                if field.is_some() {
                    match t.unescape() {
                        Ok(s) => text.push_str(&s),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            },
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            },
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == b"item" {
                    if let Some(builder) = current.take() {
                        items.push(builder.build());
                    }
                    field = None;
                } else if let (Some(open), Some(builder)) = (field, current.as_mut()) {
                    if Field::from_name(name.as_ref()) == Some(open) {
                        builder.set(open, std::mem::take(&mut text));
                        field = None;
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(items)
}

/// Reduce an HTML description to readable text.
///
/// Google News descriptions wrap the headline in an anchor, so the anchor
/// text is preferred; otherwise tags are stripped, and if nothing is left
/// the raw value is kept.
pub fn clean_description(raw: &str) -> String {
    if let Some(anchor) = ANCHOR_TEXT
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    {
        return anchor.to_string();
    }

    let stripped = HTML_TAG.replace_all(raw, "");
    let stripped = stripped.trim();
    if stripped.is_empty() { raw.to_string() } else { stripped.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOGLE_FEED: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>"consumer recall" - Google News</title>
    <item>
      <title>Stroller recall announced - Example Times</title>
      <link>https://news.google.com/rss/articles/abc?oc=5</link>
      <pubDate>Mon, 12 Oct 2026 14:00:00 GMT</pubDate>
      <description>&lt;a href="https://news.google.com/rss/articles/abc" target="_blank"&gt;Stroller recall announced&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color="#6f6f6f"&gt;Example Times&lt;/font&gt;</description>
      <source url="https://example.com">Example Times</source>
    </item>
    <item>
      <title><![CDATA[Heater fire hazard]]></title>
      <link>https://news.google.com/rss/articles/def</link>
      <description><![CDATA[<p>Space heaters <b>overheat</b></p>]]></description>
      <content:encoded><![CDATA[Full story text]]></content:encoded>
    </item>
  </channel>
</rss>"##;

    #[test]
    fn test_parse_google_news_items() {
        let items = parse_rss(GOOGLE_FEED).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title.as_deref(), Some("Stroller recall announced - Example Times"));
        assert_eq!(first.link.as_deref(), Some("https://news.google.com/rss/articles/abc?oc=5"));
        assert_eq!(first.pub_date.as_deref(), Some("Mon, 12 Oct 2026 14:00:00 GMT"));
        assert_eq!(first.source.as_deref(), Some("Example Times"));
        assert_eq!(first.description, "Stroller recall announced");
        assert_eq!(first.content, None);

        let second = &items[1];
        assert_eq!(second.title.as_deref(), Some("Heater fire hazard"));
        assert_eq!(second.description, "Space heaters overheat");
        assert_eq!(second.content.as_deref(), Some("Full story text"));
        assert_eq!(second.source, None);
    }

    #[test]
    fn test_channel_title_is_not_an_item_field() {
        let items = parse_rss(GOOGLE_FEED).unwrap();
        assert!(items.iter().all(|i| !i.title.as_deref().unwrap_or("").contains("Google News")));
    }

    #[test]
    fn test_empty_inputs_yield_no_items() {
        assert!(parse_rss("").unwrap().is_empty());
        assert!(parse_rss("<rss><channel><title>x</title></channel></rss>").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_rss("<rss><channel><item><title>x</link></item></channel></rss>");
        assert!(matches!(err, Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(clean_description("<a href=\"x\"> Headline </a> more"), "Headline");
        assert_eq!(clean_description("<A HREF='x'>Caps</A>"), "Caps");
        assert_eq!(clean_description("<p>plain <i>text</i></p>"), "plain text");
        assert_eq!(clean_description("<br/>"), "<br/>");
        assert_eq!(clean_description(""), "");
    }
}
