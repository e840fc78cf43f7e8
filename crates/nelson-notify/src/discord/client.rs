//! Minimal Discord REST client: read a forum channel, edit its tags, start a
//! thread.

use std::time::Duration;

use nelson_core::DiscordConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::format::ForumPost;
use crate::error::SinkError;
use crate::media::Attachment;

/// Discord channel type for guild forums.
pub const GUILD_FORUM: u8 = 15;
const AUTO_ARCHIVE_MINUTES: u32 = 10_080;

/// A forum tag. Fields this client does not use (emoji, moderation) are kept
/// in `extra` so editing the tag list does not reset them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ForumTag {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub available_tags: Vec<ForumTag>,
}

#[derive(Serialize)]
struct EditTags<'a> {
    available_tags: &'a [ForumTag],
}

#[derive(Serialize)]
struct StartThread<'a> {
    name: &'a str,
    auto_archive_duration: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    applied_tags: Vec<&'a str>,
    message: ThreadMessage<'a>,
}

#[derive(Serialize)]
struct ThreadMessage<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentRef<'a>>,
}

#[derive(Serialize)]
struct AttachmentRef<'a> {
    id: u32,
    filename: &'a str,
}

#[derive(Deserialize)]
struct CreatedThread {
    id: String,
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("api_base", &self.api_base)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &DiscordConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("DiscordBot (nelson, 0.1)")
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// # Errors
    ///
    /// Any [`SinkError`]; see [`check_status`].
    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel, SinkError> {
        let response = self
            .client
            .get(self.url(&format!("/channels/{channel_id}")))
            .header(header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Replace the forum's tag list and return the updated channel.
    ///
    /// # Errors
    ///
    /// Any [`SinkError`]; see [`check_status`].
    pub async fn set_available_tags(
        &self,
        channel_id: &str,
        tags: &[ForumTag],
    ) -> Result<Channel, SinkError> {
        let response = self
            .client
            .patch(self.url(&format!("/channels/{channel_id}")))
            .header(header::AUTHORIZATION, self.auth())
            .json(&EditTags {
                available_tags: tags,
            })
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Create a forum thread whose first message is `post`, optionally tagged
    /// and with one attached image. Returns the new thread's id.
    ///
    /// # Errors
    ///
    /// Any [`SinkError`]; see [`check_status`].
    pub async fn start_thread(
        &self,
        forum_id: &str,
        post: &ForumPost,
        tag_id: Option<&str>,
        attachment: Option<&Attachment>,
    ) -> Result<String, SinkError> {
        let payload = StartThread {
            name: &post.title,
            auto_archive_duration: AUTO_ARCHIVE_MINUTES,
            applied_tags: tag_id.into_iter().collect(),
            message: ThreadMessage {
                content: &post.content,
                attachments: attachment
                    .map(|a| AttachmentRef {
                        id: 0,
                        filename: &a.filename,
                    })
                    .into_iter()
                    .collect(),
            },
        };

        let request = self
            .client
            .post(self.url(&format!("/channels/{forum_id}/threads")))
            .header(header::AUTHORIZATION, self.auth());

        let request = match attachment {
            Some(file) => {
                let payload_json = serde_json::to_string(&payload)
                    .map_err(|e| SinkError::Other(format!("thread payload: {e}")))?;
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.filename.clone())
                    .mime_str(file.format.mime())?;
                request.multipart(
                    Form::new()
                        .text("payload_json", payload_json)
                        .part("files[0]", part),
                )
            }
            None => request.json(&payload),
        };

        let created: CreatedThread = check_status(request.send().await?).await?.json().await?;
        Ok(created.id)
    }
}

/// Map a non-2xx response to the sink error taxonomy: 429 is a rate limit
/// (retry-after from the body, else the header), 401/403/404 are fatal,
/// anything else is `Other`.
///
/// # Errors
///
/// Returns the mapped [`SinkError`] for any non-2xx status.
pub async fn check_status(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_retry = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok());
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let body_retry = serde_json::from_str::<RateLimitBody>(&body)
                .ok()
                .map(|b| b.retry_after);
            Err(SinkError::RateLimited {
                retry_after: body_retry
                    .or(header_retry)
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Err(
            SinkError::Fatal(format!("discord returned {status}: {body}")),
        ),
        _ => Err(SinkError::Other(format!("discord returned {status}: {body}"))),
    }
}
