//! Image attachments: download, size limit and format detection.
//!
//! An image that cannot be attached is dropped with a log line; the message
//! itself still goes out.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::SinkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Detect the format from the file's leading bytes.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Last path segment of `url` when it looks like a file name, otherwise
/// `image.<ext>` for the detected format.
#[must_use]
pub fn attachment_filename(url: &str, format: ImageFormat) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| name.contains('.') && !name.starts_with('.'))
        .unwrap_or_else(|| format!("image.{}", format.extension()))
}

#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: Client,
    max_bytes: u64,
}

impl MediaFetcher {
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client, max_bytes })
    }

    /// Download `url` and return it as an attachment, or `None` when it is
    /// unreachable, too large, or not a supported image format.
    pub async fn fetch(&self, url: &str) -> Option<Attachment> {
        match self.try_fetch(url).await {
            Ok(attachment) => attachment,
            Err(e) => {
                tracing::warn!(url, error = %e, "media: image download failed, sending without it");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Option<Attachment>, SinkError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Other(format!("image fetch returned {status}")));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            tracing::info!(url, max_bytes = self.max_bytes, "media: image over size limit, dropped");
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        if u64::try_from(bytes.len()).map_or(true, |len| len > self.max_bytes) {
            tracing::info!(url, max_bytes = self.max_bytes, "media: image over size limit, dropped");
            return Ok(None);
        }

        let Some(format) = ImageFormat::detect(&bytes) else {
            tracing::info!(url, "media: unsupported image format, dropped");
            return Ok(None);
        };

        Ok(Some(Attachment {
            filename: attachment_filename(url, format),
            format,
            bytes: bytes.to_vec(),
        }))
    }
}
