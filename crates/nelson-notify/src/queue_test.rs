use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use nelson_core::Provider;
use nelson_db::MemoryNewsStore;
use tokio::time::Instant;

use super::*;
use crate::sink::DeliveryReceipt;

const SINK: &str = "scripted";

/// Sink that replays a scripted sequence of outcomes and records when it
/// was called. Once the script runs out every delivery succeeds.
#[derive(Default)]
struct ScriptedSink {
    script: Mutex<VecDeque<Result<DeliveryReceipt, SinkError>>>,
    calls: AtomicUsize,
    called_at: Mutex<Vec<Instant>>,
}

impl ScriptedSink {
    fn with_script(script: Vec<Result<DeliveryReceipt, SinkError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn gaps(&self) -> Vec<Duration> {
        let times = self.called_at.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl NotificationSink for ScriptedSink {
    fn name(&self) -> &'static str {
        SINK
    }

    async fn deliver(&self, _item: &NewsItem) -> Result<DeliveryReceipt, SinkError> {
        let n = self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.called_at.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(DeliveryReceipt {
                    external_id: format!("auto-{n}"),
                })
            })
    }
}

fn receipt(id: &str) -> Result<DeliveryReceipt, SinkError> {
    Ok(DeliveryReceipt {
        external_id: id.to_string(),
    })
}

fn rate_limited(retry_after: Option<Duration>) -> Result<DeliveryReceipt, SinkError> {
    Err(SinkError::RateLimited { retry_after })
}

fn settings(capacity: usize) -> QueueSettings {
    QueueSettings {
        capacity,
        cadence: Duration::from_secs(5),
        inter_task_delay: Duration::from_secs(1),
        rate_limit_backoff: Duration::from_secs(10),
        max_rate_limit_retries: 1,
        sink_timeout: Duration::from_secs(15),
    }
}

fn item(n: u32) -> NewsItem {
    NewsItem {
        provider: Provider::Dtf,
        fingerprint: format!("fp-{n}"),
        title: format!("News {n}"),
        body: "Body".to_string(),
        url: format!("https://dtf.ru/{n}"),
        tags: Vec::new(),
        images: Vec::new(),
        published_at: None,
    }
}

async fn stored(store: &MemoryNewsStore, news: &NewsItem) {
    store.upsert(news).await.expect("seed upsert");
}

// ---------------------------------------------------------------------------
// Enqueue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enqueue_beyond_capacity_drops_exactly_one() {
    let sink = ScriptedSink::with_script(Vec::new());
    let (queue, _worker) = DeliveryQueue::new(sink, Arc::new(MemoryNewsStore::new()), settings(3));

    for n in 0..3 {
        queue.enqueue(item(n)).expect("within capacity");
    }
    let overflow = queue.enqueue(item(3));

    assert_eq!(overflow, Err(EnqueueError::QueueFull { sink: SINK }));
    let stats = queue.stats();
    assert_eq!(stats.enqueued, 3);
    assert_eq!(stats.dropped_full, 1);
}

#[tokio::test]
async fn enqueue_after_worker_gone_is_closed() {
    let sink = ScriptedSink::with_script(Vec::new());
    let (queue, worker) = DeliveryQueue::new(sink, Arc::new(MemoryNewsStore::new()), settings(3));
    drop(worker);

    assert_eq!(queue.enqueue(item(0)), Err(EnqueueError::Closed { sink: SINK }));
}

// ---------------------------------------------------------------------------
// Draining
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn success_records_external_ref() {
    let store = Arc::new(MemoryNewsStore::new());
    let news = item(1);
    stored(&store, &news).await;

    let sink = ScriptedSink::with_script(vec![receipt("thread-42")]);
    let (queue, worker) = DeliveryQueue::new(sink.clone(), store.clone(), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(news.clone()).unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(sink.calls(), 1);
    assert_eq!(queue.stats().delivered, 1);
    let saved = store.get(&news.key()).expect("item stored");
    assert_eq!(saved.external_refs.get(SINK).map(String::as_str), Some("thread-42"));

    drop(queue);
    handle.await.expect("worker exits once the queue is dropped");
}

#[tokio::test(start_paused = true)]
async fn drains_one_task_per_cadence_period() {
    let sink = ScriptedSink::with_script(Vec::new());
    let (queue, worker) =
        DeliveryQueue::new(sink.clone(), Arc::new(MemoryNewsStore::new()), settings(10));
    let handle = tokio::spawn(worker.run());

    for n in 0..3 {
        queue.enqueue(item(n)).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(sink.calls(), 3);
    for gap in sink.gaps() {
        assert!(gap >= Duration::from_secs(5), "tasks drained too fast: {gap:?}");
    }

    drop(queue);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn burst_after_idle_period_keeps_cadence() {
    let sink = ScriptedSink::with_script(Vec::new());
    let (queue, worker) =
        DeliveryQueue::new(sink.clone(), Arc::new(MemoryNewsStore::new()), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(item(0)).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(sink.calls(), 1);

    for n in 1..4 {
        queue.enqueue(item(n)).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(sink.calls(), 4);
    let gaps = sink.gaps();
    for gap in &gaps[1..] {
        assert!(*gap >= Duration::from_secs(5), "burst drained too fast: {gaps:?}");
    }

    drop(queue);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rate_limited_task_is_redelivered_once_after_backoff() {
    let store = Arc::new(MemoryNewsStore::new());
    let news = item(1);
    stored(&store, &news).await;

    let sink = ScriptedSink::with_script(vec![rate_limited(None), receipt("thread-7")]);
    let (queue, worker) = DeliveryQueue::new(sink.clone(), store.clone(), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(news.clone()).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(sink.calls(), 2);
    assert!(sink.gaps()[0] >= Duration::from_secs(10));
    let stats = queue.stats();
    assert_eq!(stats.rate_limited, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.dropped_rate_limited, 0);
    assert_eq!(
        store.get(&news.key()).unwrap().external_refs.get(SINK).map(String::as_str),
        Some("thread-7")
    );

    drop(queue);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn second_consecutive_rate_limit_drops_the_task() {
    let sink = ScriptedSink::with_script(vec![rate_limited(None), rate_limited(None)]);
    let (queue, worker) =
        DeliveryQueue::new(sink.clone(), Arc::new(MemoryNewsStore::new()), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(item(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(sink.calls(), 2, "task must not be retried a second time");
    let stats = queue.stats();
    assert_eq!(stats.rate_limited, 2);
    assert_eq!(stats.dropped_rate_limited, 1);
    assert_eq!(stats.delivered, 0);

    drop(queue);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sink_retry_hint_extends_backoff() {
    let sink = ScriptedSink::with_script(vec![rate_limited(Some(Duration::from_secs(30)))]);
    let (queue, worker) =
        DeliveryQueue::new(sink.clone(), Arc::new(MemoryNewsStore::new()), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(item(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(sink.calls(), 2);
    assert!(sink.gaps()[0] >= Duration::from_secs(30));

    drop(queue);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fatal_error_drops_without_retry() {
    let sink = ScriptedSink::with_script(vec![Err(SinkError::Fatal("bad token".to_string()))]);
    let (queue, worker) =
        DeliveryQueue::new(sink.clone(), Arc::new(MemoryNewsStore::new()), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(item(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(sink.calls(), 1);
    let stats = queue.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.delivered, 0);

    drop(queue);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn missing_store_row_does_not_retract_delivery() {
    // The item was never persisted, so recording the ref fails.
    let sink = ScriptedSink::with_script(vec![receipt("thread-1")]);
    let (queue, worker) =
        DeliveryQueue::new(sink.clone(), Arc::new(MemoryNewsStore::new()), settings(10));
    let handle = tokio::spawn(worker.run());

    queue.enqueue(item(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(queue.stats().delivered, 1);
    assert_eq!(queue.stats().failed, 0);

    drop(queue);
    handle.await.unwrap();
}
