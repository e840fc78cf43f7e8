//! Broadcast sink: one Telegram channel message per item.

use std::time::Duration;

use async_trait::async_trait;
use nelson_core::{DeliveryConfig, NewsItem, TelegramConfig};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::format::{escape_html, escape_html_within, exceeds_chars};
use crate::sink::{DeliveryReceipt, NotificationSink};

pub const SINK_NAME: &str = "telegram";
pub const MESSAGE_LIMIT: usize = 4096;
/// Longest escaped title kept in a message, ellipsis included.
pub const TITLE_LIMIT: usize = 256;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Render `item` as an HTML-mode message no longer than [`MESSAGE_LIMIT`]
/// characters. The title is capped at [`TITLE_LIMIT`] and the body takes
/// whatever room is left.
#[must_use]
pub fn format_message(item: &NewsItem) -> String {
    let source = escape_html(item.provider.display_name());
    let mut foot = format!("<a href=\"{}\">{source}</a>", escape_html(&item.url));
    if exceeds_chars(&foot, MESSAGE_LIMIT / 2) {
        foot = source;
    }

    let title_room = MESSAGE_LIMIT
        .saturating_sub(foot.chars().count() + "<b></b>\n\n\n\n".len())
        .min(TITLE_LIMIT);
    let head = format!("<b>{}</b>", escape_html_within(item.title.trim(), title_room));

    let fixed = head.chars().count() + foot.chars().count() + "\n\n\n\n".len();
    let body = escape_html_within(item.body.trim(), MESSAGE_LIMIT.saturating_sub(fixed));

    if body.is_empty() {
        format!("{head}\n\n{foot}")
    } else {
        format!("{head}\n\n{body}\n\n{foot}")
    }
}

pub struct TelegramSink {
    client: Client,
    api_base: String,
    token: String,
    channel_id: String,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base)
            .field("token", &"[redacted]")
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig, delivery: &DeliveryConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(delivery.sink_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            channel_id: config.channel_id.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    async fn deliver(&self, item: &NewsItem) -> Result<DeliveryReceipt, SinkError> {
        let text = format_message(item);
        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_base, self.token))
            .json(&SendMessage {
                chat_id: &self.channel_id,
                text: &text,
                parse_mode: "HTML",
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<ApiResponse>(&body).ok();

        match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(sent),
                ..
            }) => Ok(DeliveryReceipt {
                external_id: sent.message_id.to_string(),
            }),
            Some(api) => Err(classify(
                api.error_code.unwrap_or(status.as_u16()),
                api.description.as_deref().unwrap_or_default(),
                api.parameters.and_then(|p| p.retry_after),
            )),
            None => Err(classify(status.as_u16(), &body, None)),
        }
    }
}

/// 429 is a rate limit; bad credentials, missing rights and an unknown chat
/// are fatal; everything else is `Other`.
fn classify(code: u16, description: &str, retry_after: Option<u64>) -> SinkError {
    match StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR) {
        StatusCode::TOO_MANY_REQUESTS => SinkError::RateLimited {
            retry_after: retry_after.map(Duration::from_secs),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SinkError::Fatal(format!("telegram error {code}: {description}"))
        }
        StatusCode::BAD_REQUEST if description.to_lowercase().contains("chat not found") => {
            SinkError::Fatal(format!("telegram error {code}: {description}"))
        }
        _ => SinkError::Other(format!("telegram error {code}: {description}")),
    }
}

#[cfg(test)]
mod tests {
    use nelson_core::Provider;

    use super::*;
    use crate::error::SinkErrorKind;

    fn item(body: &str) -> NewsItem {
        NewsItem {
            provider: Provider::StopGame,
            fingerprint: "fp".to_string(),
            title: "Fish & Chips <3".to_string(),
            body: body.to_string(),
            url: "https://stopgame.ru/newsdata/1".to_string(),
            tags: Vec::new(),
            images: Vec::new(),
            published_at: None,
        }
    }

    #[test]
    fn message_escapes_title_and_links_source() {
        let text = format_message(&item("Body"));
        assert_eq!(
            text,
            "<b>Fish &amp; Chips &lt;3</b>\n\nBody\n\n\
             <a href=\"https://stopgame.ru/newsdata/1\">StopGame</a>"
        );
    }

    #[test]
    fn empty_body_is_omitted() {
        let text = format_message(&item("   "));
        assert!(!text.contains("\n\n\n\n"));
        assert!(text.ends_with("StopGame</a>"));
    }

    #[test]
    fn long_body_keeps_message_within_limit() {
        let text = format_message(&item(&"я".repeat(10_000)));
        assert!(text.chars().count() <= MESSAGE_LIMIT);
        assert!(text.contains("...\n\n<a href="));
    }

    #[test]
    fn oversized_title_is_cut_and_message_stays_within_limit() {
        let mut long = item("Body");
        long.title = "Заголовок & ".repeat(1_000);

        let text = format_message(&long);

        assert!(text.chars().count() <= MESSAGE_LIMIT);
        let head = text.split("</b>").next().unwrap();
        assert!(head.chars().count() <= "<b>".len() + TITLE_LIMIT);
        assert!(head.ends_with("..."));
        assert!(text.ends_with("StopGame</a>"));
    }

    #[test]
    fn oversized_url_keeps_message_within_limit() {
        let mut long = item(&"b".repeat(5_000));
        long.url = format!("https://stopgame.ru/{}", "x".repeat(5_000));

        let text = format_message(&long);

        assert!(text.chars().count() <= MESSAGE_LIMIT);
        assert!(text.ends_with("StopGame"));
    }

    #[test]
    fn classify_maps_codes() {
        assert_eq!(
            classify(429, "Too Many Requests", Some(7)).kind(),
            SinkErrorKind::RateLimited
        );
        assert!(matches!(
            classify(429, "", Some(7)),
            SinkError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));
        assert_eq!(classify(401, "Unauthorized", None).kind(), SinkErrorKind::Fatal);
        assert_eq!(
            classify(400, "Bad Request: chat not found", None).kind(),
            SinkErrorKind::Fatal
        );
        assert_eq!(
            classify(400, "Bad Request: can't parse entities", None).kind(),
            SinkErrorKind::Other
        );
        assert_eq!(classify(502, "Bad Gateway", None).kind(), SinkErrorKind::Other);
    }
}
