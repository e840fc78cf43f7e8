//! Fans newly persisted items out to every sink's queue.

use std::sync::Arc;

use nelson_core::{AppConfig, DeliveryConfig, NewsItem};
use nelson_db::NewsStore;
use tokio::task::JoinHandle;

use crate::discord::DiscordSink;
use crate::error::{EnqueueError, SinkError};
use crate::queue::{DeliveryQueue, DeliveryStats, QueueSettings};
use crate::sink::NotificationSink;
use crate::telegram::TelegramSink;

/// Result of handing one batch to the dispatcher, summed over sinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub enqueued: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    queues: Vec<DeliveryQueue>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(queues: Vec<DeliveryQueue>) -> Self {
        Self { queues }
    }

    /// Create one queue per sink and spawn its worker on the current runtime.
    #[must_use]
    pub fn start(
        sinks: Vec<Arc<dyn NotificationSink>>,
        store: &Arc<dyn NewsStore>,
        config: &DeliveryConfig,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let settings = QueueSettings::from(config);
        let mut queues = Vec::with_capacity(sinks.len());
        let mut handles = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let (queue, worker) = DeliveryQueue::new(sink, Arc::clone(store), settings);
            queues.push(queue);
            handles.push(tokio::spawn(worker.run()));
        }
        (Self::new(queues), handles)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Enqueue every item on every sink's queue. Never blocks; full queues
    /// drop the task and the drop shows up in the report and the queue's
    /// stats. Sinks do not affect each other.
    pub fn dispatch(&self, items: &[NewsItem]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for queue in &self.queues {
            for item in items {
                match queue.enqueue(item.clone()) {
                    Ok(()) => report.enqueued += 1,
                    Err(EnqueueError::QueueFull { .. }) => report.dropped += 1,
                    Err(e @ EnqueueError::Closed { .. }) => {
                        report.dropped += 1;
                        tracing::error!(error = %e, "dispatch: sink queue closed");
                    }
                }
            }
        }
        report
    }

    #[must_use]
    pub fn stats(&self) -> Vec<(&'static str, DeliveryStats)> {
        self.queues
            .iter()
            .map(|q| (q.sink_name(), q.stats()))
            .collect()
    }
}

/// Build every sink that is configured. Missing configuration disables the
/// sink with a log line.
///
/// # Errors
///
/// Returns [`SinkError::Http`] if a sink's HTTP client cannot be built.
pub fn build_sinks(config: &AppConfig) -> Result<Vec<Arc<dyn NotificationSink>>, SinkError> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();

    match &config.discord {
        Some(discord) => sinks.push(Arc::new(DiscordSink::new(discord, &config.delivery)?)),
        None => tracing::warn!(
            sink = crate::discord::SINK_NAME,
            "discord sink disabled: DISCORD_ENABLED is false or token/forum channel missing"
        ),
    }
    match &config.telegram {
        Some(telegram) => sinks.push(Arc::new(TelegramSink::new(telegram, &config.delivery)?)),
        None => tracing::warn!(
            sink = crate::telegram::SINK_NAME,
            "telegram sink disabled: TELEGRAM_ENABLED is false or token/channel missing"
        ),
    }

    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use nelson_core::Provider;
    use nelson_db::MemoryNewsStore;

    use super::*;
    use crate::sink::DeliveryReceipt;

    struct NamedSink(&'static str);

    #[async_trait::async_trait]
    impl NotificationSink for NamedSink {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn deliver(&self, _item: &NewsItem) -> Result<DeliveryReceipt, SinkError> {
            Ok(DeliveryReceipt {
                external_id: "1".to_string(),
            })
        }
    }

    fn item(n: u32) -> NewsItem {
        NewsItem {
            provider: Provider::Ixbt,
            fingerprint: format!("fp-{n}"),
            title: format!("Item {n}"),
            body: String::new(),
            url: format!("https://ixbt.games/{n}"),
            tags: Vec::new(),
            images: Vec::new(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn full_queue_on_one_sink_does_not_affect_the_other() {
        let store: Arc<dyn NewsStore> = Arc::new(MemoryNewsStore::new());
        let mut settings = QueueSettings::from(&DeliveryConfig::default());

        settings.capacity = 1;
        let (small, _small_worker) =
            DeliveryQueue::new(Arc::new(NamedSink("small")), Arc::clone(&store), settings);
        settings.capacity = 10;
        let (large, _large_worker) =
            DeliveryQueue::new(Arc::new(NamedSink("large")), Arc::clone(&store), settings);

        let dispatcher = Dispatcher::new(vec![small, large]);
        let report = dispatcher.dispatch(&[item(1), item(2), item(3)]);

        assert_eq!(report, DispatchReport { enqueued: 4, dropped: 2 });
        let stats = dispatcher.stats();
        assert_eq!(
            stats[0],
            (
                "small",
                DeliveryStats {
                    enqueued: 1,
                    dropped_full: 2,
                    ..DeliveryStats::default()
                }
            )
        );
        assert_eq!(stats[1].1.enqueued, 3);
    }
}
