use async_trait::async_trait;
use nelson_core::NewsItem;

use crate::error::SinkError;

/// What a sink hands back after a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Sink-assigned identifier (thread id, message id), stored as the item's
    /// external ref under the sink's name.
    pub external_id: String,
}

/// One external notification endpoint.
///
/// A sink formats the item for its own limits and delivers it in a single
/// call. Failures must be classifiable through [`SinkError::kind`] so the
/// delivery queue can decide between back-off and drop.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Stable name; also the key under which receipts are stored.
    fn name(&self) -> &'static str;

    /// One-time setup before the first delivery (warming caches and the
    /// like). Failure is logged and delivery proceeds.
    async fn prepare(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn deliver(&self, item: &NewsItem) -> Result<DeliveryReceipt, SinkError>;
}
