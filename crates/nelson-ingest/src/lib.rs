//! The ingestion pipeline: collect from providers, dedup against the store,
//! persist, and hand new items to the delivery queues.

pub mod collect;
pub mod cycle;
pub mod dedup;

pub use collect::{collect_all, Collected};
pub use cycle::{CycleReport, IngestCycle};
pub use dedup::{dedup_and_persist, Persisted};
