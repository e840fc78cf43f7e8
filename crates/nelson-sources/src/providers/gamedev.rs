use async_trait::async_trait;
use nelson_core::{extract_image_url, Provider, RawRecord};

use super::{last_path_segment, record_from_feed_item};
use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::rss::parse_rss;

const FEED_URL: &str = "https://gamedev.ru/rss";
// The feed is served in windows-1251, not always with a charset header.
const FEED_CHARSET: &str = "windows-1251";

pub struct GameDevSource {
    fetcher: HttpFetcher,
    url: String,
}

impl GameDevSource {
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
impl SourceProvider for GameDevSource {
    fn provider(&self) -> Provider {
        Provider::GameDevRu
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let body = self
            .fetcher
            .get_text_with(&self.url, None, FEED_CHARSET)
            .await?;
        parse_feed(&body)
    }
}

pub(crate) fn parse_feed(xml: &str) -> Result<Vec<RawRecord>, SourceError> {
    Ok(parse_rss(xml)?
        .iter()
        .map(|item| {
            let mut record = record_from_feed_item(Provider::GameDevRu, item);
            record.native_id = gamedev_id(&item.link);
            record.images.extend(extract_image_url(&item.description));
            record
        })
        .collect())
}

/// `gamedev-` plus the stem of the last path segment, e.g.
/// `https://gamedev.ru/flame/forum/123.shtml` -> `gamedev-123`.
fn gamedev_id(link: &str) -> Option<String> {
    let segment = last_path_segment(link)?;
    let stem = segment.split('.').next().unwrap_or(segment);
    (!stem.is_empty()).then(|| format!("gamedev-{stem}"))
}
