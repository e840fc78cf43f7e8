use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::Provider;

/// A record as produced by a source provider, before normalization.
///
/// `description` may still contain markup. `native_id` is the provider's own
/// stable identifier when it has one; otherwise the fingerprint is derived from
/// `link`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub provider: Provider,
    pub native_id: Option<String>,
    pub title: String,
    pub link: String,
    pub description: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub published: Option<String>,
}

impl RawRecord {
    #[must_use]
    pub fn new(provider: Provider, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            provider,
            native_id: None,
            title: title.into(),
            link: link.into(),
            description: String::new(),
            images: Vec::new(),
            tags: Vec::new(),
            published: None,
        }
    }
}

/// The dedup key: unique across all stored items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub provider: Provider,
    pub fingerprint: String,
}

/// Canonical, normalized news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub provider: Provider,
    pub fingerprint: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey {
            provider: self.provider,
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// A persisted item together with its storage metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredItem {
    pub id: i64,
    pub item: NewsItem,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sink name to sink-assigned identifier. Empty until delivery succeeds.
    pub external_refs: BTreeMap<String, String>,
}
