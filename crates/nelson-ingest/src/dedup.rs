//! Dedup & persist stage.
//!
//! Items are grouped by provider and each group is checked against the store
//! with a single existence query. Unseen items are upserted one at a time;
//! only items that were actually written move on to delivery.

use std::collections::{BTreeMap, HashMap};

use nelson_core::{ItemKey, NewsItem, Provider};
use nelson_db::NewsStore;

#[derive(Debug, Default)]
pub struct Persisted {
    /// Items not yet in the store before this stage ran.
    pub unseen: usize,
    /// Items written, one per key, in the version written last.
    pub items: Vec<NewsItem>,
    /// Providers whose existence check failed; their items wait for the next
    /// cycle.
    pub skipped: Vec<Provider>,
    pub failed_upserts: usize,
}

/// Filter `items` down to those the store has not seen and persist them.
pub async fn dedup_and_persist(store: &dyn NewsStore, items: Vec<NewsItem>) -> Persisted {
    let mut by_provider: BTreeMap<Provider, Vec<NewsItem>> = BTreeMap::new();
    for item in items {
        by_provider.entry(item.provider).or_default().push(item);
    }

    let mut persisted = Persisted::default();
    let mut position: HashMap<ItemKey, usize> = HashMap::new();

    for (provider, group) in by_provider {
        let mut candidates: Vec<String> = group.iter().map(|i| i.fingerprint.clone()).collect();
        candidates.sort_unstable();
        candidates.dedup();

        let existing = match store.existing_fingerprints(provider, &candidates).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!(
                    %provider,
                    candidates = candidates.len(),
                    error = %e,
                    "ingest: existence check failed, skipping provider this cycle"
                );
                persisted.skipped.push(provider);
                continue;
            }
        };

        let unseen: Vec<NewsItem> = group
            .into_iter()
            .filter(|item| !existing.contains(&item.fingerprint))
            .collect();
        tracing::debug!(
            %provider,
            candidates = candidates.len(),
            unseen = unseen.len(),
            "ingest: dedup"
        );
        persisted.unseen += unseen.len();

        for item in unseen {
            match store.upsert(&item).await {
                Ok(outcome) => {
                    tracing::debug!(%provider, id = outcome.id, inserted = outcome.inserted, "ingest: persisted");
                    // A key seen twice in one batch is written twice; the
                    // later version replaces the earlier one for delivery.
                    match position.get(&item.key()) {
                        Some(&idx) => persisted.items[idx] = item,
                        None => {
                            position.insert(item.key(), persisted.items.len());
                            persisted.items.push(item);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        %provider,
                        fingerprint = %item.fingerprint,
                        error = %e,
                        "ingest: upsert failed, item will not be delivered"
                    );
                    persisted.failed_upserts += 1;
                }
            }
        }
    }

    persisted
}
