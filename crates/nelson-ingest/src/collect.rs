//! Fetch stage: run every provider concurrently and normalize what comes back.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use nelson_core::{normalize_batch, NewsItem, Provider};
use nelson_sources::{SourceError, SourceProvider};

/// Everything one fetch stage produced.
#[derive(Debug, Default)]
pub struct Collected {
    /// Raw records returned by providers that succeeded.
    pub fetched: usize,
    /// Normalized items, all providers concatenated.
    pub items: Vec<NewsItem>,
    /// Providers that failed or timed out this cycle.
    pub failed: Vec<Provider>,
}

async fn fetch_one(
    source: &dyn SourceProvider,
    timeout: Duration,
) -> Result<Vec<nelson_core::RawRecord>, SourceError> {
    tokio::time::timeout(timeout, source.fetch())
        .await
        .unwrap_or(Err(SourceError::Timeout(timeout)))
}

/// Fetch from all `providers` at once, each under its own `timeout`, and wait
/// for every one of them. A failure only empties that provider's share.
pub async fn collect_all(providers: &[Arc<dyn SourceProvider>], timeout: Duration) -> Collected {
    let results = join_all(providers.iter().map(|source| async move {
        (source.provider(), fetch_one(source.as_ref(), timeout).await)
    }))
    .await;

    let mut collected = Collected::default();
    for (provider, result) in results {
        match result {
            Ok(records) => {
                collected.fetched += records.len();
                let items = normalize_batch(provider, records);
                tracing::info!(%provider, items = items.len(), "ingest: provider fetched");
                collected.items.extend(items);
            }
            Err(e) => {
                tracing::warn!(
                    %provider,
                    kind = %e.kind(),
                    error = %e,
                    "ingest: provider failed, contributes no items this cycle"
                );
                collected.failed.push(provider);
            }
        }
    }
    collected
}
