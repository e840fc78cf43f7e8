use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};

use super::record_from_feed_item;
use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::rss::parse_rss;

const FEED_URL: &str = "https://disgustingmen.com/feed/";

pub struct DisgustingMenSource {
    fetcher: HttpFetcher,
    url: String,
}

impl DisgustingMenSource {
    #[must_use]
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_url(fetcher, FEED_URL)
    }

    #[must_use]
    pub fn with_url(fetcher: HttpFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourceProvider for DisgustingMenSource {
    fn provider(&self) -> Provider {
        Provider::DisgustingMen
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let body = self.fetcher.get_text(&self.url).await?;
        parse_feed(&body)
    }
}

pub(crate) fn parse_feed(xml: &str) -> Result<Vec<RawRecord>, SourceError> {
    Ok(parse_rss(xml)?
        .iter()
        .map(|item| {
            let mut record = record_from_feed_item(Provider::DisgustingMen, item);
            record.description = lead_paragraph(&item.description);
            record.images.extend(item.enclosure_url(false).map(str::to_string));
            record
        })
        .collect())
}

/// Keep only the lead paragraph of a WordPress excerpt and replace the
/// `[…]` read-more marker.
fn lead_paragraph(description: &str) -> String {
    let description = description
        .replace("[&#8230;]", "...")
        .replace("[\u{2026}]", "...");
    match description.match_indices("<p>").nth(1) {
        Some((idx, _)) => description[..idx].to_string(),
        None => description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_paragraph_cuts_before_second_paragraph() {
        let out = lead_paragraph("<p>One [&#8230;]</p><p>Two</p><p>Three</p>");
        assert_eq!(out, "<p>One ...</p>");
    }

    #[test]
    fn lead_paragraph_keeps_single_paragraph() {
        assert_eq!(lead_paragraph("<p>Only [\u{2026}]</p>"), "<p>Only ...</p>");
    }

    #[test]
    fn parse_feed_applies_excerpt_rules() {
        let xml = r#"<rss><channel><item>
            <title>Article</title>
            <link>https://disgustingmen.com/a/</link>
            <description><![CDATA[<p>Lead [&#8230;]</p><p>The post appeared first</p>]]></description>
            <enclosure url="https://disgustingmen.com/a.jpg" type="image/jpeg"/>
        </item></channel></rss>"#;

        let records = parse_feed(xml).unwrap();
        assert_eq!(records[0].description, "<p>Lead ...</p>");
        assert_eq!(records[0].images, vec!["https://disgustingmen.com/a.jpg".to_string()]);
    }
}
