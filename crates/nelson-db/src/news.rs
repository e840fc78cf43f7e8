//! Database operations for the `news_items` table.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use nelson_core::{ItemKey, NewsItem, Provider, StoredItem};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `news_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsItemRow {
    pub id: i64,
    pub provider: String,
    pub fingerprint: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub external_refs: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsItemRow {
    /// Convert the row into the domain type.
    ///
    /// Non-string values inside `external_refs` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidProvider`] if the stored provider key is not
    /// one the application knows about.
    pub fn into_stored(self) -> Result<StoredItem, DbError> {
        let provider: Provider = self
            .provider
            .parse()
            .map_err(|_| DbError::InvalidProvider(self.provider.clone()))?;

        let external_refs: BTreeMap<String, String> = match self.external_refs {
            serde_json::Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        };

        Ok(StoredItem {
            id: self.id,
            item: NewsItem {
                provider,
                fingerprint: self.fingerprint,
                title: self.title,
                body: self.body,
                url: self.url,
                tags: self.tags,
                images: self.images,
                published_at: self.published_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            external_refs,
        })
    }
}

// ---------------------------------------------------------------------------
// news_items operations
// ---------------------------------------------------------------------------

/// Returns the subset of `candidates` already stored for `provider`.
///
/// One round-trip regardless of how many candidates are passed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn existing_fingerprints(
    pool: &PgPool,
    provider: Provider,
    candidates: &[String],
) -> Result<HashSet<String>, DbError> {
    if candidates.is_empty() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query_scalar::<_, String>(
        "SELECT fingerprint FROM news_items \
         WHERE provider = $1 AND fingerprint = ANY($2::text[])",
    )
    .bind(provider.as_str())
    .bind(candidates)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Inserts the item, or updates its mutable fields if `(provider, fingerprint)`
/// already exists.
///
/// `created_at` and `external_refs` of an existing row are left untouched.
/// Returns `(id, inserted)`; `inserted` is `false` when an existing row was
/// updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_news_item(pool: &PgPool, item: &NewsItem) -> Result<(i64, bool), DbError> {
    let row = sqlx::query_as::<_, (i64, bool)>(
        "INSERT INTO news_items \
             (provider, fingerprint, title, body, url, tags, images, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (provider, fingerprint) DO UPDATE SET \
             title        = EXCLUDED.title, \
             body         = EXCLUDED.body, \
             url          = EXCLUDED.url, \
             tags         = EXCLUDED.tags, \
             images       = EXCLUDED.images, \
             published_at = COALESCE(EXCLUDED.published_at, news_items.published_at), \
             updated_at   = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(item.provider.as_str())
    .bind(&item.fingerprint)
    .bind(&item.title)
    .bind(&item.body)
    .bind(&item.url)
    .bind(&item.tags)
    .bind(&item.images)
    .bind(item.published_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Merges `sink -> external_id` into the item's `external_refs`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches `key`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_external_ref(
    pool: &PgPool,
    key: &ItemKey,
    sink: &str,
    external_id: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE news_items \
         SET external_refs = external_refs || jsonb_build_object($3::text, $4::text) \
         WHERE provider = $1 AND fingerprint = $2",
    )
    .bind(key.provider.as_str())
    .bind(&key.fingerprint)
    .bind(sink)
    .bind(external_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Returns one page of items, newest first. `page` is zero-based.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_news(
    pool: &PgPool,
    page: u32,
    page_size: u32,
) -> Result<Vec<NewsItemRow>, DbError> {
    let offset = i64::from(page) * i64::from(page_size);

    let rows = sqlx::query_as::<_, NewsItemRow>(
        "SELECT id, provider, fingerprint, title, body, url, tags, images, \
                published_at, external_refs, created_at, updated_at \
         FROM news_items \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1 OFFSET $2",
    )
    .bind(i64::from(page_size))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(provider: &str, refs: serde_json::Value) -> NewsItemRow {
        NewsItemRow {
            id: 7,
            provider: provider.to_string(),
            fingerprint: "fp".to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            url: "https://dtf.ru/a".to_string(),
            tags: vec!["games".to_string()],
            images: Vec::new(),
            published_at: None,
            external_refs: refs,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn into_stored_maps_fields_and_refs() {
        let stored = row(
            "dtf",
            serde_json::json!({"discord": "99", "telegram": "12", "junk": 5}),
        )
        .into_stored()
        .unwrap();

        assert_eq!(stored.id, 7);
        assert_eq!(stored.item.provider, Provider::Dtf);
        assert_eq!(stored.item.tags, vec!["games".to_string()]);
        assert_eq!(stored.external_refs.len(), 2);
        assert_eq!(stored.external_refs.get("discord").map(String::as_str), Some("99"));
    }

    #[test]
    fn into_stored_rejects_unknown_provider() {
        let result = row("myspace", serde_json::json!({})).into_stored();
        assert!(matches!(result, Err(DbError::InvalidProvider(ref p)) if p == "myspace"));
    }
}
