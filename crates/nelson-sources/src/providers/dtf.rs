use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};

use super::record_from_feed_item;
use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::rss::{parse_rss, strip_cdata};

const FEED_URL: &str = "https://dtf.ru/rss";

pub struct DtfSource {
    fetcher: HttpFetcher,
    url: String,
}

impl DtfSource {
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
impl SourceProvider for DtfSource {
    fn provider(&self) -> Provider {
        Provider::Dtf
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
            let mut record = record_from_feed_item(Provider::Dtf, item);
            record.title = strip_cdata(&item.title).to_string();
            record.native_id = Some(item.guid.clone()).filter(|g| !g.is_empty());
            record.images.extend(item.enclosure_url(true).map(str::to_string));
            record
        })
        .collect())
}
