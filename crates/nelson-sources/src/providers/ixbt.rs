use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;

const PAGE_URL: &str = "https://ixbt.games/news/";
const SITE_BASE: &str = "https://ixbt.games/";

pub struct IxbtSource {
    fetcher: HttpFetcher,
    url: String,
}

impl IxbtSource {
    #[must_use]
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_url(fetcher, PAGE_URL)
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
impl SourceProvider for IxbtSource {
    fn provider(&self) -> Provider {
        Provider::Ixbt
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let body = self.fetcher.get_text(&self.url).await?;
        parse_page(&body)
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Html(format!("selector {css:?}: {e}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the news listing. Each card yields one record; cards without a
/// title link are skipped.
pub(crate) fn parse_page(html: &str) -> Result<Vec<RawRecord>, SourceError> {
    let card_sel = selector("div.row.no-gutters")?;
    let title_sel = selector("div.card-title a")?;
    let desc_sel = selector("div.d-flex.d-sm-block.my-2")?;
    let img_sel = selector("img")?;
    let base = Url::parse(SITE_BASE).map_err(|e| SourceError::Html(e.to_string()))?;

    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for card in document.select(&card_sel) {
        let Some(anchor) = card.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }
        let Ok(link) = base.join(href) else {
            continue;
        };

        let mut record = RawRecord::new(Provider::Ixbt, text_of(anchor), link.to_string());
        record.description = card.select(&desc_sel).next().map(text_of).unwrap_or_default();
        record.images.extend(
            card.select(&img_sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string),
        );
        record.tags = vec!["games".to_string(), "gaming".to_string()];
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="row no-gutters">
            <img src="/uploads/a.jpg">
            <div class="card-title"><a href="/news/2025/06/01/first.html">  First   news </a></div>
            <div class="d-flex d-sm-block my-2">Short <b>summary</b></div>
        </div>
        <div class="row no-gutters">
            <div class="card-title"><span>no link</span></div>
        </div>
        <div class="row no-gutters">
            <div class="card-title"><a href="https://ixbt.games/news/second.html">Second</a></div>
        </div>
    </body></html>"#;

    #[test]
    fn parse_page_extracts_cards() {
        let records = parse_page(PAGE).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "First news");
        assert_eq!(first.link, "https://ixbt.games/news/2025/06/01/first.html");
        assert_eq!(first.description, "Short summary");
        assert_eq!(first.images, vec!["/uploads/a.jpg".to_string()]);
        assert_eq!(first.tags, vec!["games".to_string(), "gaming".to_string()]);

        assert_eq!(records[1].link, "https://ixbt.games/news/second.html");
        assert!(records[1].images.is_empty());
    }

    #[test]
    fn parse_page_without_cards_is_empty() {
        assert!(parse_page("<html><body><p>maintenance</p></body></html>")
            .unwrap()
            .is_empty());
    }
}
