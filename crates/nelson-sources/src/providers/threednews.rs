use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};

use super::record_from_feed_item;
use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::rss::parse_rss;

const FEED_URL: &str = "https://3dnews.ru/news/rss/";

const GAMES_KEYWORDS: &[&str] = &["игры", "gamesblender", "игровые консоли"];
const HARDWARE_KEYWORDS: &[&str] = &[
    "видеокарты",
    "жесткие диски",
    "мониторы",
    "ноутбуки",
    "пк",
    "серверы",
    "корпуса",
    "аудио",
    "видео периферия",
    "мобильные телефоны",
    "смартфоны",
    "планшетные компьютеры",
    "разгон и замеры производительности",
];
const SOFTWARE_KEYWORDS: &[&str] = &[
    "по ",
    "драйверы",
    "искусственный интеллект",
    "новости сети",
    "im-клиенты",
    "нанотехнологии",
    "на острие науки",
    "космос",
    "мир роботехники",
    "финансовые новости",
];

pub struct ThreeDNewsSource {
    fetcher: HttpFetcher,
    url: String,
}

impl ThreeDNewsSource {
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
impl SourceProvider for ThreeDNewsSource {
    fn provider(&self) -> Provider {
        Provider::ThreeDNews
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
            let mut record = record_from_feed_item(Provider::ThreeDNews, item);
            record.images.extend(item.enclosure_url(false).map(str::to_string));
            record.tags.extend(
                item.categories
                    .iter()
                    .find_map(|c| category_tag(c))
                    .map(str::to_string),
            );
            record
        })
        .collect())
}

/// Map a 3DNews category onto one of the coarse tags.
fn category_tag(category: &str) -> Option<&'static str> {
    let category = category.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| category.contains(k));

    if matches(GAMES_KEYWORDS) {
        Some("Games")
    } else if matches(HARDWARE_KEYWORDS) {
        Some("Hardware")
    } else if matches(SOFTWARE_KEYWORDS) {
        Some("Software")
    } else {
        None
    }
}
