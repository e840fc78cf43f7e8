//! Bounded, rate-limited delivery queue: one per sink.
//!
//! Producers enqueue without blocking; a full queue drops the new task and
//! counts it. A single worker starts at most one task per cadence period,
//! waits a short delay after each, and re-enqueues a rate-limited task after a back-off a
//! bounded number of times.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nelson_core::{DeliveryConfig, ItemKey, NewsItem};
use nelson_db::NewsStore;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use crate::error::{EnqueueError, SinkError, SinkErrorKind};
use crate::sink::NotificationSink;

/// One item waiting for delivery to one sink. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTask {
    pub item: NewsItem,
    /// How many times this task has already been re-enqueued after a rate
    /// limit.
    pub rate_limit_retries: u32,
}

impl DeliveryTask {
    #[must_use]
    pub fn new(item: NewsItem) -> Self {
        Self {
            item,
            rate_limit_retries: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> ItemKey {
        self.item.key()
    }
}

/// Worker timing and retry policy, usually taken from [`DeliveryConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub capacity: usize,
    pub cadence: Duration,
    pub inter_task_delay: Duration,
    pub rate_limit_backoff: Duration,
    pub max_rate_limit_retries: u32,
    /// Upper bound on one `deliver` call, image download included.
    pub sink_timeout: Duration,
}

impl From<&DeliveryConfig> for QueueSettings {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            capacity: config.queue_capacity.max(1),
            cadence: config.cadence(),
            inter_task_delay: config.inter_task_delay(),
            rate_limit_backoff: config.rate_limit_backoff(),
            max_rate_limit_retries: config.max_rate_limit_retries,
            sink_timeout: config.delivery_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    rate_limited: AtomicU64,
    failed: AtomicU64,
    dropped_full: AtomicU64,
    dropped_rate_limited: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of a queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub enqueued: u64,
    pub delivered: u64,
    /// Rate-limit signals received, whether or not the task was retried.
    pub rate_limited: u64,
    /// Tasks dropped after a fatal or other sink error.
    pub failed: u64,
    /// Tasks dropped because the queue was full.
    pub dropped_full: u64,
    /// Tasks dropped after exhausting their rate-limit retries.
    pub dropped_rate_limited: u64,
}

/// Producer handle for one sink's queue. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryQueue {
    sink_name: &'static str,
    sender: mpsc::Sender<DeliveryTask>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("sink", &self.sink_name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl DeliveryQueue {
    /// Create a queue and its (not yet running) worker. Spawn
    /// [`DeliveryWorker::run`] to start draining.
    #[must_use]
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        store: Arc<dyn NewsStore>,
        settings: QueueSettings,
    ) -> (Self, DeliveryWorker) {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        let counters = Arc::new(Counters::default());
        let queue = Self {
            sink_name: sink.name(),
            sender: sender.clone(),
            counters: Arc::clone(&counters),
        };
        let worker = DeliveryWorker {
            sink,
            store,
            settings,
            receiver,
            requeue: sender.downgrade(),
            counters,
        };
        (queue, worker)
    }

    #[must_use]
    pub fn sink_name(&self) -> &'static str {
        self.sink_name
    }

    /// Queue `item` for delivery without waiting.
    ///
    /// # Errors
    ///
    /// [`EnqueueError::QueueFull`] when the buffer is at capacity (the task is
    /// dropped and counted), [`EnqueueError::Closed`] when the worker is gone.
    pub fn enqueue(&self, item: NewsItem) -> Result<(), EnqueueError> {
        match self.sender.try_send(DeliveryTask::new(item)) {
            Ok(()) => {
                Counters::bump(&self.counters.enqueued);
                Ok(())
            }
            Err(TrySendError::Full(task)) => {
                Counters::bump(&self.counters.dropped_full);
                tracing::warn!(
                    sink = self.sink_name,
                    provider = %task.item.provider,
                    title = %task.item.title,
                    "delivery: queue full, task dropped"
                );
                Err(EnqueueError::QueueFull {
                    sink: self.sink_name,
                })
            }
            Err(TrySendError::Closed(_)) => Err(EnqueueError::Closed {
                sink: self.sink_name,
            }),
        }
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        let c = &self.counters;
        DeliveryStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            rate_limited: c.rate_limited.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped_full: c.dropped_full.load(Ordering::Relaxed),
            dropped_rate_limited: c.dropped_rate_limited.load(Ordering::Relaxed),
        }
    }
}

/// The single consumer of a [`DeliveryQueue`].
///
/// Holds only a weak sender for re-enqueueing, so it stops once every
/// [`DeliveryQueue`] handle is dropped and the buffer is empty.
pub struct DeliveryWorker {
    sink: Arc<dyn NotificationSink>,
    store: Arc<dyn NewsStore>,
    settings: QueueSettings,
    receiver: mpsc::Receiver<DeliveryTask>,
    requeue: mpsc::WeakSender<DeliveryTask>,
    counters: Arc<Counters>,
}

impl DeliveryWorker {
    pub async fn run(mut self) {
        let sink = self.sink.name();
        if let Err(e) = self.sink.prepare().await {
            tracing::warn!(sink, error = %e, "delivery: sink preparation failed, continuing");
        }
        tracing::info!(sink, "delivery: worker started");

        // Paced from when a task is taken, so time spent idle never earns an
        // early slot for the next burst.
        let mut next_slot = Instant::now();
        loop {
            let Some(task) = self.receiver.recv().await else {
                break;
            };
            tokio::time::sleep_until(next_slot).await;
            next_slot = Instant::now() + self.settings.cadence;
            self.process(task).await;
            tokio::time::sleep(self.settings.inter_task_delay).await;
        }

        tracing::info!(sink, "delivery: worker stopped");
    }

    async fn process(&self, task: DeliveryTask) {
        let sink = self.sink.name();
        let outcome =
            match tokio::time::timeout(self.settings.sink_timeout, self.sink.deliver(&task.item))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(self.settings.sink_timeout)),
            };

        match outcome {
            Ok(receipt) => {
                Counters::bump(&self.counters.delivered);
                tracing::info!(
                    sink,
                    provider = %task.item.provider,
                    external_id = %receipt.external_id,
                    "delivery: delivered"
                );
                if let Err(e) = self
                    .store
                    .record_external_ref(&task.key(), sink, &receipt.external_id)
                    .await
                {
                    tracing::error!(
                        sink,
                        provider = %task.item.provider,
                        fingerprint = %task.item.fingerprint,
                        error = %e,
                        "delivery: failed to record external ref"
                    );
                }
            }
            Err(e) => match e.kind() {
                SinkErrorKind::RateLimited => self.handle_rate_limit(task, &e).await,
                SinkErrorKind::Fatal | SinkErrorKind::Other => {
                    Counters::bump(&self.counters.failed);
                    tracing::error!(
                        sink,
                        provider = %task.item.provider,
                        title = %task.item.title,
                        error = %e,
                        "delivery: failed, task dropped"
                    );
                }
            },
        }
    }

    async fn handle_rate_limit(&self, mut task: DeliveryTask, error: &SinkError) {
        let sink = self.sink.name();
        Counters::bump(&self.counters.rate_limited);

        if task.rate_limit_retries >= self.settings.max_rate_limit_retries {
            Counters::bump(&self.counters.dropped_rate_limited);
            tracing::warn!(
                sink,
                provider = %task.item.provider,
                retries = task.rate_limit_retries,
                "delivery: rate limited again, task dropped"
            );
            return;
        }

        let hint = match error {
            SinkError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };
        let backoff = hint.map_or(self.settings.rate_limit_backoff, |h| {
            h.max(self.settings.rate_limit_backoff)
        });
        tracing::warn!(
            sink,
            provider = %task.item.provider,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            "delivery: rate limited, backing off"
        );
        tokio::time::sleep(backoff).await;

        task.rate_limit_retries += 1;
        let Some(sender) = self.requeue.upgrade() else {
            tracing::warn!(sink, "delivery: queue closed, rate-limited task dropped");
            return;
        };
        match sender.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                Counters::bump(&self.counters.dropped_full);
                tracing::warn!(
                    sink,
                    provider = %task.item.provider,
                    "delivery: queue full on re-enqueue, task dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(sink, "delivery: queue closed, rate-limited task dropped");
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
