//! # Login Ingestion Pipeline
//!
//! Sequential fetch → transform → persist → acknowledge loop.
//!
//! Each batch is fully resolved before the next fetch. Persistence always
//! precedes acknowledgment, so a message is only removed from the queue once
//! its row is committed. Any failure halts the loop without acknowledging the
//! in-flight batch; its lease then expires and the queue redelivers it.

use super::states::PipelineState;
use crate::config::IngestConfig;
use crate::database::LoginSink;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::{log_batch_operation, log_error};
use crate::messaging::MessageSource;
use crate::models::{AckEntry, RawMessage};
use crate::transform::Transformer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Loop parameters, usually derived from `IngestConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub batch_size: i32,
    pub lease_seconds: i32,
    pub max_batches: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            lease_seconds: 30,
            max_batches: None,
        }
    }
}

impl From<&IngestConfig> for PipelineSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.queue.batch_size,
            lease_seconds: config.queue.visibility_timeout_seconds,
            max_batches: config.pipeline.max_batches,
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Non-empty batches committed to the store
    pub batches: u64,
    /// Records committed, including ones the store skipped as duplicates
    pub messages_persisted: u64,
    /// Rows the store actually inserted
    pub rows_inserted: u64,
    pub messages_acknowledged: u64,
    pub final_state: PipelineState,
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The fetch came back empty
    Drained,
    /// A batch was persisted and acknowledged
    Processed { messages: usize, rows_inserted: u64 },
}

/// Drives messages from a `MessageSource` into a `LoginSink`
pub struct LoginPipeline {
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn LoginSink>,
    transformer: Transformer,
    settings: PipelineSettings,
    state: PipelineState,
    summary: RunSummary,
}

impl std::fmt::Debug for LoginPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginPipeline")
            .field("queue", &self.source.queue_name())
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("summary", &self.summary)
            .finish()
    }
}

impl LoginPipeline {
    pub fn new(
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn LoginSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            sink,
            transformer: Transformer::new(),
            settings,
            state: PipelineState::Idle,
            summary: RunSummary::default(),
        }
    }

    pub fn from_config(
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn LoginSink>,
        config: &IngestConfig,
    ) -> Self {
        Self::new(source, sink, PipelineSettings::from(config))
    }

    /// Replace the transformer, e.g. to pin the fallback `create_date`
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Progress so far, also meaningful after a failed run
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run until the queue is drained or the batch limit is reached.
    ///
    /// Batches committed and acknowledged before a failure stay committed.
    pub async fn run(&mut self) -> PipelineResult<RunSummary> {
        self.transition(PipelineState::Fetching)?;
        info!(
            queue = %self.source.queue_name(),
            batch_size = self.settings.batch_size,
            lease_seconds = self.settings.lease_seconds,
            max_batches = ?self.settings.max_batches,
            "Starting login ingestion"
        );

        loop {
            match self.process_next_batch().await {
                Ok(BatchOutcome::Drained) => break,
                Ok(BatchOutcome::Processed {
                    messages,
                    rows_inserted,
                }) => {
                    debug!(
                        batch_number = self.summary.batches,
                        messages,
                        rows_inserted,
                        "Batch processed"
                    );
                    if self.batch_limit_reached() {
                        info!(batches = self.summary.batches, "Batch limit reached");
                        self.transition(PipelineState::Done)?;
                        break;
                    }
                    self.transition(PipelineState::Fetching)?;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        info!(
            batches = self.summary.batches,
            persisted = self.summary.messages_persisted,
            inserted = self.summary.rows_inserted,
            acknowledged = self.summary.messages_acknowledged,
            "Login ingestion complete"
        );
        self.summary.final_state = self.state;
        Ok(self.summary.clone())
    }

    /// One iteration starting in `Fetching`.
    ///
    /// Ends in `Done` when the fetch was empty and in `Acknowledging` after a
    /// processed batch.
    #[instrument(skip(self), fields(queue = %self.source.queue_name(), batch_number = self.summary.batches + 1))]
    async fn process_next_batch(&mut self) -> PipelineResult<BatchOutcome> {
        let batch = self
            .source
            .fetch(self.settings.batch_size, self.settings.lease_seconds)
            .await?;

        if batch.is_empty() {
            debug!("Queue drained");
            self.transition(PipelineState::Done)?;
            return Ok(BatchOutcome::Drained);
        }

        let batch_number = self.summary.batches + 1;
        log_batch_operation(
            "fetch",
            self.source.queue_name(),
            batch_number,
            batch.len(),
            "leased",
            None,
        );

        self.transition(PipelineState::Transforming)?;
        let records = self.transformer.transform_batch(&batch)?;

        self.transition(PipelineState::Persisting)?;
        let rows_inserted = self.sink.persist(&records).await?;
        self.summary.messages_persisted += records.len() as u64;
        self.summary.rows_inserted += rows_inserted;

        self.transition(PipelineState::Acknowledging)?;
        let entries: Vec<AckEntry> = batch.iter().map(RawMessage::ack_entry).collect();
        match self.source.acknowledge(&entries).await {
            Ok(()) => {}
            Err(PipelineError::PartialAck { failed, succeeded }) => {
                // The batch is committed and the successful deletions are final.
                self.summary.messages_acknowledged += succeeded as u64;
                self.summary.batches = batch_number;
                return Err(PipelineError::PartialAck { failed, succeeded });
            }
            Err(e) => return Err(e),
        }
        self.summary.messages_acknowledged += entries.len() as u64;
        self.summary.batches = batch_number;

        log_batch_operation(
            "acknowledge",
            self.source.queue_name(),
            batch_number,
            batch.len(),
            "committed",
            None,
        );

        Ok(BatchOutcome::Processed {
            messages: batch.len(),
            rows_inserted,
        })
    }

    fn batch_limit_reached(&self) -> bool {
        self.settings
            .max_batches
            .is_some_and(|limit| self.summary.batches >= limit)
    }

    fn transition(&mut self, to: PipelineState) -> PipelineResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(from = %self.state, to = %to, "Pipeline transition");
        self.state = to;
        Ok(())
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        let failed_in = self.state;
        let context = format!(
            "state={failed_in} batches_completed={} redeliverable={} batch_in_flight={}",
            self.summary.batches,
            error.is_redeliverable(),
            failed_in.holds_batch()
        );
        log_error("pipeline", error.kind(), &error.to_string(), Some(&context));

        if self.state.can_transition_to(PipelineState::Failed) {
            self.state = PipelineState::Failed;
        }
        self.summary.final_state = self.state;
        error
    }
}
