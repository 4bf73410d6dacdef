//! In-process queue with visibility-timeout semantics.
//!
//! Behaves like the SQS subset the pipeline uses: fetch leases messages for a
//! number of seconds, acknowledge deletes them by receipt handle, and expired
//! leases make messages visible again. Time comes from `tokio::time`, so tests
//! running with a paused clock can step through lease expiry.

use super::{validate_fetch_request, MessageSource};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{AckEntry, AckFailure, RawMessage};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct QueuedMessage {
    message_id: String,
    body: Vec<u8>,
    receipt_handle: Option<String>,
    visible_at: Instant,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<QueuedMessage>,
    pending_fetch_failure: Option<String>,
    rejected_acks: HashSet<String>,
}

/// Lease-simulating queue kept entirely in memory
#[derive(Debug)]
pub struct InMemoryMessageSource {
    name: String,
    state: Mutex<QueueState>,
}

impl InMemoryMessageSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Enqueue a raw body and return its message id
    pub fn send(&self, body: impl Into<Vec<u8>>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.state.lock().messages.push_back(QueuedMessage {
            message_id: message_id.clone(),
            body: body.into(),
            receipt_handle: None,
            visible_at: Instant::now(),
            receive_count: 0,
        });
        message_id
    }

    /// Enqueue a JSON-encoded body
    pub fn send_json<T: Serialize>(&self, message: &T) -> PipelineResult<String> {
        let body = serde_json::to_vec(message).map_err(|e| {
            PipelineError::configuration("in_memory_queue", format!("unserializable message: {e}"))
        })?;
        Ok(self.send(body))
    }

    /// Messages not yet deleted, leased or not
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages currently under an active lease
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.state
            .lock()
            .messages
            .iter()
            .filter(|m| m.visible_at > now)
            .count()
    }

    /// How many times a message has been handed out
    pub fn receive_count(&self, message_id: &str) -> Option<u32> {
        self.state
            .lock()
            .messages
            .iter()
            .find(|m| m.message_id == message_id)
            .map(|m| m.receive_count)
    }

    /// Make the next fetch fail as if the queue returned a non-success status
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        self.state.lock().pending_fetch_failure = Some(message.into());
    }

    /// Refuse every deletion of the given message until cleared
    pub fn reject_acks_for(&self, message_id: impl Into<String>) {
        self.state.lock().rejected_acks.insert(message_id.into());
    }

    pub fn clear_rejected_acks(&self) {
        self.state.lock().rejected_acks.clear();
    }
}

#[async_trait::async_trait]
impl MessageSource for InMemoryMessageSource {
    async fn fetch(&self, max_batch: i32, lease_seconds: i32) -> PipelineResult<Vec<RawMessage>> {
        validate_fetch_request(max_batch, lease_seconds)?;

        let mut state = self.state.lock();
        if let Some(message) = state.pending_fetch_failure.take() {
            return Err(PipelineError::source_unavailable(&self.name, message));
        }

        let now = Instant::now();
        let lease = Duration::from_secs(u64::from(lease_seconds.unsigned_abs()));
        let limit = usize::try_from(max_batch).unwrap_or(0);

        let batch: Vec<RawMessage> = state
            .messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(limit)
            .map(|m| {
                let handle = Uuid::new_v4().to_string();
                m.receipt_handle = Some(handle.clone());
                m.visible_at = now + lease;
                m.receive_count += 1;
                RawMessage::new(m.message_id.clone(), handle, m.body.clone())
            })
            .collect();

        debug!(queue = %self.name, count = batch.len(), "Leased messages from in-memory queue");
        Ok(batch)
    }

    async fn acknowledge(&self, entries: &[AckEntry]) -> PipelineResult<()> {
        let mut state = self.state.lock();
        let mut failed = Vec::new();
        let mut succeeded = 0;

        for entry in entries {
            if state.rejected_acks.contains(&entry.message_id) {
                failed.push(AckFailure {
                    message_id: entry.message_id.clone(),
                    code: "InternalError".to_string(),
                    reason: Some("deletion rejected".to_string()),
                });
                continue;
            }

            let position = state.messages.iter().position(|m| {
                m.message_id == entry.message_id
                    && m.receipt_handle.as_deref() == Some(entry.receipt_handle.as_str())
            });

            match position {
                Some(index) => {
                    state.messages.remove(index);
                    succeeded += 1;
                }
                None => failed.push(AckFailure {
                    message_id: entry.message_id.clone(),
                    code: "ReceiptHandleIsInvalid".to_string(),
                    reason: Some("no delivery matches this receipt handle".to_string()),
                }),
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::partial_ack(failed, succeeded))
        }
    }

    fn queue_name(&self) -> &str {
        &self.name
    }
}
