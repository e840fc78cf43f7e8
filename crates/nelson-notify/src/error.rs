use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    /// The endpoint asked us to slow down. `retry_after` is the endpoint's
    /// own hint, when it gave one.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The endpoint rejected the request in a way retrying cannot fix, such
    /// as bad credentials or a missing channel.
    #[error("rejected permanently: {0}")]
    Fatal(String),

    #[error("delivery failed: {0}")]
    Other(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink call timed out after {0:?}")]
    Timeout(Duration),
}

/// How the delivery queue treats a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    RateLimited,
    Fatal,
    Other,
}

impl SinkError {
    #[must_use]
    pub fn kind(&self) -> SinkErrorKind {
        match self {
            SinkError::RateLimited { .. } => SinkErrorKind::RateLimited,
            SinkError::Fatal(_) => SinkErrorKind::Fatal,
            SinkError::Other(_) | SinkError::Http(_) | SinkError::Timeout(_) => {
                SinkErrorKind::Other
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("delivery queue for {sink} is full")]
    QueueFull { sink: &'static str },

    #[error("delivery queue for {sink} is closed")]
    Closed { sink: &'static str },
}
