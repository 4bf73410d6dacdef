use serde::{Deserialize, Serialize};

/// A single delivery of a queue message.
///
/// `receipt_handle` identifies this specific delivery; a redelivered message
/// keeps its `message_id` but gets a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: Vec<u8>,
}

impl RawMessage {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
        }
    }

    /// Identifiers needed to delete this delivery from the queue
    pub fn ack_entry(&self) -> AckEntry {
        AckEntry {
            message_id: self.message_id.clone(),
            receipt_handle: self.receipt_handle.clone(),
        }
    }
}

/// Entry passed to `MessageSource::acknowledge`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AckEntry {
    pub message_id: String,
    pub receipt_handle: String,
}

/// A single deletion the queue refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckFailure {
    pub message_id: String,
    pub code: String,
    pub reason: Option<String>,
}
