//! Shared outbound HTTP client for all providers.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;

use crate::error::SourceError;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Browser-like HTTP client with a per-request timeout.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body decoded per the response charset, or
    /// UTF-8 when none is declared.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnexpectedStatus`] for non-2xx responses and
    /// [`SourceError::Http`] for network failures.
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        self.get_text_with(url, None, "utf-8").await
    }

    /// Like [`HttpFetcher::get_text`] with an optional `Cookie` header and a
    /// fallback charset for servers that do not declare one.
    ///
    /// # Errors
    ///
    /// Same as [`HttpFetcher::get_text`].
    pub async fn get_text_with(
        &self,
        url: &str,
        cookie: Option<&str>,
        default_charset: &str,
    ) -> Result<String, SourceError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text_with_charset(default_charset).await?)
    }

    /// GET `url` and deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Json`] when the body does not match `T`, plus
    /// everything [`HttpFetcher::get_text`] returns.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<T, SourceError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|source| SourceError::Json {
            context: context.to_string(),
            source,
        })
    }
}
