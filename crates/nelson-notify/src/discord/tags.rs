//! Forum tag cache: provider tag name to Discord tag id.
//!
//! Loaded on first use (or by [`ForumTagCache::refresh`] at startup). Loading
//! creates any provider tag the forum lacks. A lookup miss reloads once before
//! giving up, so tags added or renamed on the Discord side are picked up
//! without a restart.

use std::collections::HashMap;

use nelson_core::Provider;
use tokio::sync::Mutex;

use super::client::{DiscordClient, ForumTag, GUILD_FORUM};
use crate::error::SinkError;

pub struct ForumTagCache {
    client: DiscordClient,
    forum_id: String,
    tags: Mutex<Option<HashMap<String, String>>>,
}

impl ForumTagCache {
    #[must_use]
    pub fn new(client: DiscordClient, forum_id: impl Into<String>) -> Self {
        Self {
            client,
            forum_id: forum_id.into(),
            tags: Mutex::new(None),
        }
    }

    /// Reload the mapping from Discord. Returns the number of known tags.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the forum cannot be read or edited, or the
    /// channel is not a forum.
    pub async fn refresh(&self) -> Result<usize, SinkError> {
        let mut guard = self.tags.lock().await;
        let loaded = self.load().await?;
        let count = loaded.len();
        *guard = Some(loaded);
        Ok(count)
    }

    /// Tag id for `provider`'s forum tag, or `None` if it cannot be resolved.
    pub async fn tag_for(&self, provider: Provider) -> Option<String> {
        let name = provider.forum_tag().to_lowercase();
        let mut guard = self.tags.lock().await;

        if let Some(id) = guard.as_ref().and_then(|tags| tags.get(&name)) {
            return Some(id.clone());
        }

        match self.load().await {
            Ok(loaded) => {
                let id = loaded.get(&name).cloned();
                if id.is_none() {
                    tracing::warn!(%provider, tag = %name, "discord: forum tag still missing after refresh");
                }
                *guard = Some(loaded);
                id
            }
            Err(e) => {
                tracing::warn!(%provider, error = %e, "discord: forum tag refresh failed");
                None
            }
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>, SinkError> {
        let channel = self.client.get_channel(&self.forum_id).await?;
        if channel.kind != GUILD_FORUM {
            return Err(SinkError::Fatal(format!(
                "channel {} is not a forum (type {})",
                channel.id, channel.kind
            )));
        }

        let mut tags = channel.available_tags;
        let missing: Vec<&str> = Provider::ALL
            .iter()
            .map(|p| p.forum_tag())
            .filter(|name| !tags.iter().any(|t| t.name.eq_ignore_ascii_case(name)))
            .collect();

        if !missing.is_empty() {
            tracing::info!(forum = %self.forum_id, missing = ?missing, "discord: creating forum tags");
            tags.extend(missing.iter().map(|name| ForumTag::named(name)));
            tags = self
                .client
                .set_available_tags(&self.forum_id, &tags)
                .await?
                .available_tags;
        }

        Ok(tags
            .into_iter()
            .filter_map(|tag| tag.id.map(|id| (tag.name.to_lowercase(), id)))
            .collect())
    }
}
