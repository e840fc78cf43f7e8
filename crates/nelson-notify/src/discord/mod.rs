//! Forum sink: one Discord forum thread per item.

mod client;
mod format;
mod tags;

pub use client::{check_status, Channel, DiscordClient, ForumTag, GUILD_FORUM};
pub use format::{format_post, ForumPost, BODY_LIMIT, TITLE_LIMIT};
pub use tags::ForumTagCache;

use async_trait::async_trait;
use nelson_core::{DeliveryConfig, DiscordConfig, NewsItem};

use crate::error::SinkError;
use crate::media::MediaFetcher;
use crate::sink::{DeliveryReceipt, NotificationSink};

pub const SINK_NAME: &str = "discord";

pub struct DiscordSink {
    client: DiscordClient,
    forum_id: String,
    tags: ForumTagCache,
    media: MediaFetcher,
}

impl DiscordSink {
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if an HTTP client cannot be built.
    pub fn new(config: &DiscordConfig, delivery: &DeliveryConfig) -> Result<Self, SinkError> {
        let client = DiscordClient::new(config, delivery.sink_timeout())?;
        let media = MediaFetcher::new(delivery.media_timeout(), delivery.max_attachment_bytes)?;
        Ok(Self {
            tags: ForumTagCache::new(client.clone(), config.forum_channel_id.clone()),
            client,
            forum_id: config.forum_channel_id.clone(),
            media,
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    async fn prepare(&self) -> Result<(), SinkError> {
        let count = self.tags.refresh().await?;
        tracing::info!(forum = %self.forum_id, tags = count, "discord: forum tags loaded");
        Ok(())
    }

    async fn deliver(&self, item: &NewsItem) -> Result<DeliveryReceipt, SinkError> {
        let attachment = match item.images.first() {
            Some(url) => self.media.fetch(url).await,
            None => None,
        };
        let post = format_post(item, attachment.is_some());
        let tag_id = self.tags.tag_for(item.provider).await;

        let thread_id = self
            .client
            .start_thread(&self.forum_id, &post, tag_id.as_deref(), attachment.as_ref())
            .await?;
        Ok(DeliveryReceipt {
            external_id: thread_id,
        })
    }
}
