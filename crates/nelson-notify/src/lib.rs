//! Notification sinks and the per-sink delivery queues that feed them.

pub mod discord;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod media;
pub mod queue;
pub mod sink;
pub mod telegram;

pub use discord::DiscordSink;
pub use dispatcher::{build_sinks, DispatchReport, Dispatcher};
pub use error::{EnqueueError, SinkError, SinkErrorKind};
pub use queue::{DeliveryQueue, DeliveryStats, DeliveryTask, DeliveryWorker, QueueSettings};
pub use sink::{DeliveryReceipt, NotificationSink};
pub use telegram::TelegramSink;
