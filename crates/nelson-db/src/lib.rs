//! Postgres-backed deduplication store for news items.

use std::time::Duration;

use thiserror::Error;

pub mod memory;
pub mod news;
pub mod pool;
pub mod store;

pub use memory::MemoryNewsStore;
pub use news::{
    existing_fingerprints, list_recent_news, record_external_ref, upsert_news_item, NewsItemRow,
};
pub use pool::{apply_migrations, open_pool, PoolConfig};
pub use store::{NewsStore, PgNewsStore, UpsertOutcome};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("store query timed out after {0:?}")]
    Timeout(Duration),
    #[error("stored row has unknown provider {0:?}")]
    InvalidProvider(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}
