//! One ingestion cycle: fetch, dedup, persist, hand off for delivery.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nelson_core::Provider;
use nelson_db::NewsStore;
use nelson_notify::Dispatcher;
use nelson_sources::SourceProvider;
use tokio::sync::Mutex;

use crate::collect::collect_all;
use crate::dedup::dedup_and_persist;

/// Summary of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub normalized: usize,
    pub unseen: usize,
    pub persisted: usize,
    pub enqueued: usize,
    pub dropped: usize,
    pub failed_upserts: usize,
    /// Providers whose fetch failed or timed out.
    pub failed_providers: Vec<Provider>,
    /// Providers whose existence check failed.
    pub skipped_providers: Vec<Provider>,
    pub elapsed: Duration,
}

/// Runs cycles against a fixed set of providers. At most one cycle runs at a
/// time; a cycle started while another is in progress is skipped.
pub struct IngestCycle {
    providers: Vec<Arc<dyn SourceProvider>>,
    store: Arc<dyn NewsStore>,
    dispatcher: Dispatcher,
    fetch_timeout: Duration,
    running: Mutex<()>,
}

impl IngestCycle {
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        store: Arc<dyn NewsStore>,
        dispatcher: Dispatcher,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            store,
            dispatcher,
            fetch_timeout,
            running: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one cycle. Returns `None` without doing anything when another
    /// cycle is still running.
    pub async fn run_once(&self) -> Option<CycleReport> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("ingest: previous cycle still running, skipping this tick");
            return None;
        };

        let started = Instant::now();
        tracing::info!(providers = self.providers.len(), "ingest: cycle started");

        let collected = collect_all(&self.providers, self.fetch_timeout).await;
        let normalized = collected.items.len();
        let persisted = dedup_and_persist(self.store.as_ref(), collected.items).await;
        let dispatch = self.dispatcher.dispatch(&persisted.items);

        let report = CycleReport {
            fetched: collected.fetched,
            normalized,
            unseen: persisted.unseen,
            persisted: persisted.items.len(),
            enqueued: dispatch.enqueued,
            dropped: dispatch.dropped,
            failed_upserts: persisted.failed_upserts,
            failed_providers: collected.failed,
            skipped_providers: persisted.skipped,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            fetched = report.fetched,
            normalized = report.normalized,
            unseen = report.unseen,
            persisted = report.persisted,
            enqueued = report.enqueued,
            dropped = report.dropped,
            failed_upserts = report.failed_upserts,
            failed_providers = ?report.failed_providers,
            skipped_providers = ?report.skipped_providers,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "ingest: cycle complete"
        );
        Some(report)
    }
}
