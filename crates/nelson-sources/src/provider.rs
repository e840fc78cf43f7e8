use async_trait::async_trait;
use nelson_core::{Provider, RawRecord};

use crate::error::SourceError;

/// One external content source.
///
/// Implementations fetch a single fixed URL, parse it according to that
/// site's layout and return raw records. An empty result is success.
/// Implementations hold no state shared with other providers.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError>;
}
