//! The deduplication store contract and its Postgres implementation.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use nelson_core::{ItemKey, NewsItem, Provider, StoredItem};
use sqlx::PgPool;

use crate::{news, DbError};

/// Result of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    /// `true` if a new row was created, `false` if an existing one was updated.
    pub inserted: bool,
}

/// Persistent set of seen `(provider, fingerprint)` pairs plus the items
/// behind them.
///
/// Implementations must enforce uniqueness of `(provider, fingerprint)` and
/// make [`NewsStore::upsert`] atomic, so concurrent callers need no locking.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Which of `candidates` are already stored for `provider`. Answered with a
    /// single batched lookup.
    async fn existing_fingerprints(
        &self,
        provider: Provider,
        candidates: &[String],
    ) -> Result<HashSet<String>, DbError>;

    /// Insert the item, or refresh its mutable fields if the key exists.
    async fn upsert(&self, item: &NewsItem) -> Result<UpsertOutcome, DbError>;

    /// Attach a sink-assigned identifier to a stored item.
    async fn record_external_ref(
        &self,
        key: &ItemKey,
        sink: &str,
        external_id: &str,
    ) -> Result<(), DbError>;

    /// One page of stored items, newest first. `page` is zero-based.
    async fn recent_items(&self, page: u32, page_size: u32) -> Result<Vec<StoredItem>, DbError>;
}

/// [`NewsStore`] backed by the `news_items` table.
///
/// Every call is bounded by `query_timeout`; a timeout surfaces as
/// [`DbError::Timeout`].
#[derive(Clone)]
pub struct PgNewsStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgNewsStore {
    #[must_use]
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, DbError>
    where
        T: Send,
        F: Future<Output = Result<T, DbError>> + Send,
    {
        if let Ok(result) = tokio::time::timeout(self.query_timeout, fut).await {
            result
        } else {
            tracing::warn!(
                op,
                timeout_ms = u64::try_from(self.query_timeout.as_millis()).unwrap_or(u64::MAX),
                "store: query timed out"
            );
            Err(DbError::Timeout(self.query_timeout))
        }
    }
}

#[async_trait]
impl NewsStore for PgNewsStore {
    async fn existing_fingerprints(
        &self,
        provider: Provider,
        candidates: &[String],
    ) -> Result<HashSet<String>, DbError> {
        self.bounded(
            "existing_fingerprints",
            news::existing_fingerprints(&self.pool, provider, candidates),
        )
        .await
    }

    async fn upsert(&self, item: &NewsItem) -> Result<UpsertOutcome, DbError> {
        let (id, inserted) = self
            .bounded("upsert", news::upsert_news_item(&self.pool, item))
            .await?;
        Ok(UpsertOutcome { id, inserted })
    }

    async fn record_external_ref(
        &self,
        key: &ItemKey,
        sink: &str,
        external_id: &str,
    ) -> Result<(), DbError> {
        self.bounded(
            "record_external_ref",
            news::record_external_ref(&self.pool, key, sink, external_id),
        )
        .await
    }

    async fn recent_items(&self, page: u32, page_size: u32) -> Result<Vec<StoredItem>, DbError> {
        let rows = self
            .bounded(
                "recent_items",
                news::list_recent_news(&self.pool, page, page_size),
            )
            .await?;
        rows.into_iter().map(news::NewsItemRow::into_stored).collect()
    }
}
