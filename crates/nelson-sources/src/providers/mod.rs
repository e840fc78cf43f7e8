//! Source provider implementations, one module per site.

mod disgustingmen;
mod dtf;
mod epicgames;
mod gamedev;
mod ixbt;
mod steam;
mod stopgame;
mod threednews;

pub use disgustingmen::DisgustingMenSource;
pub use dtf::DtfSource;
pub use epicgames::EpicGamesSource;
pub use gamedev::GameDevSource;
pub use ixbt::IxbtSource;
pub use steam::SteamSource;
pub use stopgame::StopGameSource;
pub use threednews::ThreeDNewsSource;

use nelson_core::{Provider, RawRecord};

use crate::rss::FeedItem;

/// Baseline mapping shared by the RSS providers: title, link, description and
/// publication date. Provider modules adjust the rest.
pub(crate) fn record_from_feed_item(provider: Provider, item: &FeedItem) -> RawRecord {
    let mut record = RawRecord::new(provider, item.title.clone(), item.link.clone());
    record.description.clone_from(&item.description);
    if !item.pub_date.is_empty() {
        record.published = Some(item.pub_date.clone());
    }
    record
}

/// Last `/`-separated segment of a URL-ish string, ignoring a trailing slash.
pub(crate) fn last_path_segment(value: &str) -> Option<&str> {
    value
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}
