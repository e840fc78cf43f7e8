//! Minimal RSS 2.0 item extraction on top of `quick-xml`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::SourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime: Option<String>,
}

/// The fields of one `<item>` that providers care about. Text fields are
/// unescaped but may still contain markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub description: String,
    pub pub_date: String,
    pub categories: Vec<String>,
    pub enclosures: Vec<Enclosure>,
}

impl FeedItem {
    /// First enclosure URL, optionally restricted to image MIME types.
    #[must_use]
    pub fn enclosure_url(&self, images_only: bool) -> Option<&str> {
        self.enclosures
            .iter()
            .find(|e| {
                !e.url.is_empty()
                    && (!images_only || e.mime.as_deref().is_some_and(|m| m.contains("image")))
            })
            .map(|e| e.url.as_str())
    }
}

/// Parse every `<item>` of an RSS document.
///
/// # Errors
///
/// Returns [`SourceError::Xml`] if the document is not well-formed.
pub fn parse_rss(xml: &str) -> Result<Vec<FeedItem>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"item" {
                    current = Some(FeedItem::default());
                } else if let (Some(item), b"enclosure") = (current.as_mut(), e.name().as_ref()) {
                    item.enclosures.push(read_enclosure(&e)?);
                }
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if let (Some(item), b"enclosure") = (current.as_mut(), e.name().as_ref()) {
                    item.enclosures.push(read_enclosure(&e)?);
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                } else if let Some(item) = current.as_mut() {
                    let value = text.trim().to_string();
                    match name.as_ref() {
                        b"title" => item.title = value,
                        b"link" => item.link = value,
                        b"guid" => item.guid = value,
                        b"description" => item.description = value,
                        b"pubDate" => item.pub_date = value,
                        b"category" if !value.is_empty() => item.categories.push(value),
                        _ => {}
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

fn read_enclosure(e: &BytesStart<'_>) -> Result<Enclosure, SourceError> {
    let mut enclosure = Enclosure::default();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"url" => enclosure.url = value,
            b"type" => enclosure.mime = Some(value),
            _ => {}
        }
    }
    Ok(enclosure)
}

/// Strip a prefix/suffix that some feeds leave around text, such as
/// `<![CDATA[` markers inside already-unescaped titles.
#[must_use]
pub fn strip_cdata(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Channel title</title>
    <link>https://example.com/</link>
    <item>
      <title>First &amp; foremost</title>
      <link>https://example.com/1</link>
      <guid isPermaLink="false">guid-1</guid>
      <description><![CDATA[<p>Hello <b>there</b></p>]]></description>
      <pubDate>Mon, 02 Jun 2025 10:00:00 +0000</pubDate>
      <category>Games</category>
      <category>PC</category>
      <enclosure url="https://example.com/1.jpg" type="image/jpeg" length="10"/>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
      <enclosure url="https://example.com/2.mp4" type="video/mp4"></enclosure>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_ignores_channel_fields() {
        let items = parse_rss(FEED).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "First & foremost");
        assert_eq!(first.link, "https://example.com/1");
        assert_eq!(first.guid, "guid-1");
        assert_eq!(first.description, "<p>Hello <b>there</b></p>");
        assert_eq!(first.pub_date, "Mon, 02 Jun 2025 10:00:00 +0000");
        assert_eq!(first.categories, vec!["Games".to_string(), "PC".to_string()]);
        assert_eq!(first.enclosure_url(true), Some("https://example.com/1.jpg"));
    }

    #[test]
    fn enclosure_filter_skips_non_images() {
        let items = parse_rss(FEED).unwrap();
        let second = &items[1];
        assert_eq!(second.enclosure_url(false), Some("https://example.com/2.mp4"));
        assert_eq!(second.enclosure_url(true), None);
    }

    #[test]
    fn empty_channel_is_success() {
        let items = parse_rss("<rss><channel><title>x</title></channel></rss>").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let result = parse_rss("<rss><channel><item><title>x</item></channel></rss>");
        assert!(matches!(result, Err(SourceError::Xml(_))));
    }

    #[test]
    fn strip_cdata_removes_markers() {
        assert_eq!(strip_cdata(" <![CDATA[Title]]> "), "Title");
        assert_eq!(strip_cdata("Plain"), "Plain");
    }
}
