//! In-process [`NewsStore`] used for dry runs and tests.
//!
//! Keeps the same contract as the Postgres store: `(provider, fingerprint)`
//! is unique, upserts refresh mutable fields only, and lookups are one call
//! per provider. It also counts calls and can inject failures, so pipeline
//! behaviour can be observed without a database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use nelson_core::{ItemKey, NewsItem, Provider, StoredItem};

use crate::store::{NewsStore, UpsertOutcome};
use crate::DbError;

#[derive(Default)]
struct State {
    items: BTreeMap<ItemKey, StoredItem>,
    next_id: i64,
    existence_calls: HashMap<Provider, usize>,
    upsert_calls: usize,
    failing_existence: HashSet<Provider>,
    failing_upserts: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryNewsStore {
    state: Mutex<State>,
}

impl MemoryNewsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every existence check for `provider` fail.
    pub fn fail_existence_for(&self, provider: Provider) {
        self.lock().failing_existence.insert(provider);
    }

    /// Make upserts of the item with `fingerprint` fail.
    pub fn fail_upsert_for(&self, fingerprint: &str) {
        self.lock().failing_upserts.insert(fingerprint.to_string());
    }

    #[must_use]
    pub fn existence_calls(&self, provider: Provider) -> usize {
        self.lock()
            .existence_calls
            .get(&provider)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, key: &ItemKey) -> Option<StoredItem> {
        self.lock().items.get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock only happens in a failing test; the
        // data is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl NewsStore for MemoryNewsStore {
    async fn existing_fingerprints(
        &self,
        provider: Provider,
        candidates: &[String],
    ) -> Result<HashSet<String>, DbError> {
        let mut state = self.lock();
        *state.existence_calls.entry(provider).or_insert(0) += 1;
        if state.failing_existence.contains(&provider) {
            return Err(DbError::Timeout(std::time::Duration::ZERO));
        }

        Ok(candidates
            .iter()
            .filter(|fp| {
                state.items.contains_key(&ItemKey {
                    provider,
                    fingerprint: (*fp).clone(),
                })
            })
            .cloned()
            .collect())
    }

    async fn upsert(&self, item: &NewsItem) -> Result<UpsertOutcome, DbError> {
        let mut state = self.lock();
        state.upsert_calls += 1;
        if state.failing_upserts.contains(&item.fingerprint) {
            return Err(DbError::Timeout(std::time::Duration::ZERO));
        }

        let now = Utc::now();
        if let Some(existing) = state.items.get_mut(&item.key()) {
            let published_at = item.published_at.or(existing.item.published_at);
            existing.item = NewsItem {
                published_at,
                ..item.clone()
            };
            existing.updated_at = now;
            return Ok(UpsertOutcome {
                id: existing.id,
                inserted: false,
            });
        }

        state.next_id += 1;
        let id = state.next_id;
        state.items.insert(
            item.key(),
            StoredItem {
                id,
                item: item.clone(),
                created_at: now,
                updated_at: now,
                external_refs: BTreeMap::new(),
            },
        );
        Ok(UpsertOutcome { id, inserted: true })
    }

    async fn record_external_ref(
        &self,
        key: &ItemKey,
        sink: &str,
        external_id: &str,
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        let stored = state.items.get_mut(key).ok_or(DbError::NotFound)?;
        stored
            .external_refs
            .insert(sink.to_string(), external_id.to_string());
        Ok(())
    }

    async fn recent_items(&self, page: u32, page_size: u32) -> Result<Vec<StoredItem>, DbError> {
        let state = self.lock();
        let mut all: Vec<&StoredItem> = state.items.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let skip = usize::try_from(u64::from(page) * u64::from(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        Ok(all.into_iter().skip(skip).take(take).cloned().collect())
    }
}
