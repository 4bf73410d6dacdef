//! Source and sink doubles that record every call in a shared event log.

#![allow(dead_code)]

use login_ingest::database::{ConflictPolicy, InMemoryLoginStore, LoginSink};
use login_ingest::messaging::{InMemoryMessageSource, MessageSource};
use login_ingest::models::{AckEntry, PersistedLogin, RawMessage};
use login_ingest::PipelineResult;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Fetch { returned: usize },
    FetchFailed,
    Persist { records: usize },
    PersistFailed,
    Acknowledge { message_ids: Vec<String> },
    AcknowledgeFailed { message_ids: Vec<String> },
}

/// Ordered log shared between a recording source and sink
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn fetch_sizes(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Fetch { returned } => Some(returned),
                _ => None,
            })
            .collect()
    }

    /// Every message id passed to a successful or failed acknowledge call
    pub fn acknowledged_ids(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .flat_map(|e| match e {
                Event::Acknowledge { message_ids } => message_ids,
                Event::AcknowledgeFailed { message_ids } => message_ids,
                _ => Vec::new(),
            })
            .collect()
    }

    pub fn ack_calls(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Event::Acknowledge { .. } | Event::AcknowledgeFailed { .. }
                )
            })
            .count()
    }

    pub fn persist_calls(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Persist { .. } | Event::PersistFailed))
            .count()
    }
}

/// In-memory queue that logs fetch and acknowledge calls
pub struct RecordingSource {
    pub queue: InMemoryMessageSource,
    log: EventLog,
}

impl RecordingSource {
    pub fn new(log: &EventLog) -> Self {
        Self {
            queue: InMemoryMessageSource::new("login-queue"),
            log: log.clone(),
        }
    }
}

#[async_trait::async_trait]
impl MessageSource for RecordingSource {
    async fn fetch(&self, max_batch: i32, lease_seconds: i32) -> PipelineResult<Vec<RawMessage>> {
        match self.queue.fetch(max_batch, lease_seconds).await {
            Ok(batch) => {
                self.log.push(Event::Fetch {
                    returned: batch.len(),
                });
                Ok(batch)
            }
            Err(e) => {
                self.log.push(Event::FetchFailed);
                Err(e)
            }
        }
    }

    async fn acknowledge(&self, entries: &[AckEntry]) -> PipelineResult<()> {
        let message_ids: Vec<String> = entries.iter().map(|e| e.message_id.clone()).collect();
        let result = self.queue.acknowledge(entries).await;
        self.log.push(match result {
            Ok(()) => Event::Acknowledge { message_ids },
            Err(_) => Event::AcknowledgeFailed { message_ids },
        });
        result
    }

    fn queue_name(&self) -> &str {
        self.queue.queue_name()
    }
}

/// In-memory store that logs persist calls
pub struct RecordingSink {
    pub store: InMemoryLoginStore,
    log: EventLog,
}

impl RecordingSink {
    pub fn new(log: &EventLog) -> Self {
        Self::with_store(log, InMemoryLoginStore::new(ConflictPolicy::SkipExisting))
    }

    pub fn with_store(log: &EventLog, store: InMemoryLoginStore) -> Self {
        Self {
            store,
            log: log.clone(),
        }
    }
}

#[async_trait::async_trait]
impl LoginSink for RecordingSink {
    async fn persist(&self, batch: &[PersistedLogin]) -> PipelineResult<u64> {
        let result = self.store.persist(batch).await;
        self.log.push(match result {
            Ok(_) => Event::Persist {
                records: batch.len(),
            },
            Err(_) => Event::PersistFailed,
        });
        result
    }
}

/// Shared log plus a recording source and sink wired to it
pub fn recording_pair() -> (EventLog, Arc<RecordingSource>, Arc<RecordingSink>) {
    let log = EventLog::default();
    let source = Arc::new(RecordingSource::new(&log));
    let sink = Arc::new(RecordingSink::new(&log));
    (log, source, sink)
}
