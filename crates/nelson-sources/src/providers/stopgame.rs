use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};

use super::record_from_feed_item;
use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::rss::parse_rss;

const FEED_URL: &str = "https://rss.stopgame.ru/rss_all.xml";
const READ_MORE_SUFFIX: &str = "\u{2026} [\u{2026}]";

pub struct StopGameSource {
    fetcher: HttpFetcher,
    url: String,
}

impl StopGameSource {
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
impl SourceProvider for StopGameSource {
    fn provider(&self) -> Provider {
        Provider::StopGame
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let body = self.fetcher.get_text(&self.url).await?;
        parse_feed(&body)
    }
}

/// Items whose description is empty once the read-more suffix is removed are
/// skipped.
pub(crate) fn parse_feed(xml: &str) -> Result<Vec<RawRecord>, SourceError> {
    Ok(parse_rss(xml)?
        .iter()
        .filter_map(|item| {
            let description = item.description.replace(READ_MORE_SUFFIX, "");
            if description.trim().is_empty() {
                return None;
            }
            let mut record = record_from_feed_item(Provider::StopGame, item);
            record.description = description;
            record.native_id = stopgame_id(&item.link);
            record.images.extend(item.enclosure_url(false).map(str::to_string));
            Some(record)
        })
        .collect())
}

/// Fifth `/`-separated part of the link: the article id in
/// `https://stopgame.ru/newsdata/<id>/<slug>`.
fn stopgame_id(link: &str) -> Option<String> {
    link.split('/')
        .nth(4)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
