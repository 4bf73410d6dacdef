//! # Messaging Module
//!
//! Lease-based message sources feeding the ingestion pipeline.
//!
//! A fetched message stays invisible to other consumers for the lease
//! duration. If it is not acknowledged before the lease runs out the queue
//! hands it out again, which is how failed batches get retried.

pub mod in_memory;
pub mod sqs_client;

pub use in_memory::InMemoryMessageSource;
pub use sqs_client::SqsMessageSource;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{AckEntry, RawMessage};

/// Largest batch a single fetch may request
pub const MAX_BATCH_SIZE: i32 = 10;

/// A queue that leases messages on fetch and deletes them on acknowledge
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch up to `max_batch` messages and lease them for `lease_seconds`.
    ///
    /// An empty vector means the queue is drained.
    async fn fetch(&self, max_batch: i32, lease_seconds: i32) -> PipelineResult<Vec<RawMessage>>;

    /// Permanently delete previously fetched deliveries.
    ///
    /// Deletions are independent: on `PartialAck` the entries not listed as
    /// failed are gone for good.
    async fn acknowledge(&self, entries: &[AckEntry]) -> PipelineResult<()>;

    /// Human-readable name of the queue, used in logs and errors
    fn queue_name(&self) -> &str;
}

/// Reject batch sizes the queue protocol cannot serve
pub fn validate_fetch_request(max_batch: i32, lease_seconds: i32) -> PipelineResult<()> {
    if !(1..=MAX_BATCH_SIZE).contains(&max_batch) {
        return Err(PipelineError::configuration(
            "messaging",
            format!("batch size must be between 1 and {MAX_BATCH_SIZE}, got {max_batch}"),
        ));
    }
    if lease_seconds < 0 {
        return Err(PipelineError::configuration(
            "messaging",
            format!("lease must not be negative, got {lease_seconds}s"),
        ));
    }
    Ok(())
}
