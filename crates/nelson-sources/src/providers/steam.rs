use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};

use super::{last_path_segment, record_from_feed_item};
use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::rss::parse_rss;

const FEED_URL: &str = "https://store.steampowered.com/feeds/news/group/4145017";
const LANGUAGE_COOKIE: &str = "Steam_Language=russian";
const FALLBACK_IMAGE: &str =
    "https://clan.fastly.steamstatic.com/images/4145017/8bfe522d8f2d91cd7dc3460771349a46ed8d6e95.jpg";

pub struct SteamSource {
    fetcher: HttpFetcher,
    url: String,
}

impl SteamSource {
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
impl SourceProvider for SteamSource {
    fn provider(&self) -> Provider {
        Provider::SteamDevelopers
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let body = self
            .fetcher
            .get_text_with(&self.url, Some(LANGUAGE_COOKIE), "utf-8")
            .await?;
        parse_feed(&body)
    }
}

pub(crate) fn parse_feed(xml: &str) -> Result<Vec<RawRecord>, SourceError> {
    Ok(parse_rss(xml)?
        .iter()
        .map(|item| {
            let mut record = record_from_feed_item(Provider::SteamDevelopers, item);
            record.native_id = last_path_segment(&item.guid).map(|id| format!("steam-{id}"));
            record.images.push(
                item.enclosure_url(false)
                    .unwrap_or(FALLBACK_IMAGE)
                    .to_string(),
            );
            record
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_tail_is_native_id_and_fallback_image_applies() {
        let xml = r#"<rss><channel>
            <item>
                <title>Patch notes</title>
                <link>https://store.steampowered.com/news/app/1/view/555</link>
                <guid isPermaLink="true">https://store.steampowered.com/news/app/1/view/555</guid>
            </item>
            <item>
                <title>Sale</title>
                <link>https://store.steampowered.com/news/app/1/view/556</link>
                <enclosure url="https://cdn.steam/556.jpg" type="image/jpeg"/>
            </item>
        </channel></rss>"#;

        let records = parse_feed(xml).unwrap();
        assert_eq!(records[0].native_id.as_deref(), Some("steam-555"));
        assert_eq!(records[0].images, vec![FALLBACK_IMAGE.to_string()]);
        assert_eq!(records[1].native_id, None);
        assert_eq!(records[1].images, vec!["https://cdn.steam/556.jpg".to_string()]);
    }
}
