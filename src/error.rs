//! # Pipeline Error Types
//!
//! Structured error handling for the ingestion pipeline using thiserror.
//! Every variant states whether the in-flight batch will come back through
//! lease expiry, which is the only retry mechanism the pipeline relies on.

use crate::models::AckFailure;
use crate::orchestration::PipelineState;
use thiserror::Error;

/// Errors raised while fetching, transforming, persisting or acknowledging logins
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Transport or non-success status from the queue on fetch. Halts the run.
    #[error("Source unavailable: {queue}: {message}")]
    SourceUnavailable { queue: String, message: String },

    /// Malformed or incomplete message body. The batch is not acknowledged.
    #[error("Validation error{}: {reason}", .message_id.as_deref().map(|id| format!(" for message {id}")).unwrap_or_default())]
    Validation {
        message_id: Option<String>,
        reason: String,
    },

    /// Storage transaction failure. The batch is rolled back and not acknowledged.
    #[error("Persistence error: {operation}: {message}")]
    Persistence { operation: String, message: String },

    /// Some deletions failed after the batch was committed.
    #[error("Partial acknowledgment failure: {} of {} entries failed", .failed.len(), .failed.len() + .succeeded)]
    PartialAck {
        failed: Vec<AckFailure>,
        succeeded: usize,
    },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
}

impl PipelineError {
    /// Create a source unavailable error
    pub fn source_unavailable(queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            queue: queue.into(),
            message: message.into(),
        }
    }

    /// Create a validation error that is not yet tied to a message
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            message_id: None,
            reason: reason.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a partial acknowledgment error
    pub fn partial_ack(failed: Vec<AckFailure>, succeeded: usize) -> Self {
        Self::PartialAck { failed, succeeded }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Attach the id of the offending message to a validation error.
    /// Other variants pass through untouched.
    pub fn for_message(self, id: &str) -> Self {
        match self {
            Self::Validation { reason, .. } => Self::Validation {
                message_id: Some(id.to_string()),
                reason,
            },
            other => other,
        }
    }

    /// True when the in-flight batch was left unacknowledged and its lease
    /// will expire, so the same messages are fetched again later.
    pub fn is_redeliverable(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Persistence { .. })
    }

    /// Short stable name used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::Validation { .. } => "validation",
            Self::Persistence { .. } => "persistence",
            Self::PartialAck { .. } => "partial_ack",
            Self::Configuration { .. } => "configuration",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

/// Conversion from sqlx::Error to PipelineError
impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let operation = match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => "unique_violation",
                    sqlx::error::ErrorKind::NotNullViolation => "not_null_violation",
                    sqlx::error::ErrorKind::CheckViolation => "check_violation",
                    _ => "database",
                };
                PipelineError::persistence(operation, db_err.to_string())
            }
            sqlx::Error::PoolTimedOut => {
                PipelineError::persistence("pool", "Timed out acquiring a connection")
            }
            sqlx::Error::PoolClosed => PipelineError::persistence("pool", "Database pool is closed"),
            sqlx::Error::Configuration(config_err) => {
                PipelineError::configuration("database", config_err.to_string())
            }
            _ => PipelineError::persistence("connection", err.to_string()),
        }
    }
}

/// Conversion from serde_json::Error to PipelineError
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::validation(format!("Malformed message body: {err}"))
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeliverable_classification() {
        assert!(PipelineError::validation("bad").is_redeliverable());
        assert!(PipelineError::persistence("insert", "boom").is_redeliverable());
        assert!(!PipelineError::source_unavailable("q", "down").is_redeliverable());
        assert!(!PipelineError::partial_ack(vec![], 3).is_redeliverable());
    }

    #[test]
    fn test_for_message_only_touches_validation() {
        let err = PipelineError::validation("missing field").for_message("m-1");
        assert!(matches!(
            err,
            PipelineError::Validation { message_id: Some(ref id), .. } if id == "m-1"
        ));

        let err = PipelineError::persistence("insert", "boom").for_message("m-1");
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::validation("missing field `ip`").for_message("abc");
        assert_eq!(
            err.to_string(),
            "Validation error for message abc: missing field `ip`"
        );

        let err = PipelineError::validation("bad");
        assert_eq!(err.to_string(), "Validation error: bad");

        let failed = vec![AckFailure {
            message_id: "m-2".to_string(),
            code: "ReceiptHandleIsInvalid".to_string(),
            reason: None,
        }];
        let err = PipelineError::partial_ack(failed, 4);
        assert_eq!(
            err.to_string(),
            "Partial acknowledgment failure: 1 of 5 entries failed"
        );
    }

    #[test]
    fn test_serde_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: PipelineError = json_err.into();
        assert!(matches!(err, PipelineError::Validation { .. }));
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_sqlx_conversion() {
        let err: PipelineError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }
}
