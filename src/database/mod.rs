//! # Login Persistence
//!
//! Repository interface for the `user_logins` table and its implementations.
//!
//! ## Key Components
//!
//! - [`LoginSink`] - all-or-nothing batch persistence
//! - [`login_repository`] - PostgreSQL implementation over a SQLx pool
//! - [`in_memory`] - transactional in-memory table for tests and dry runs
//!
//! A batch is either fully committed or not visible at all, so the pipeline
//! can gate acknowledgment on a single success/failure result.

pub mod in_memory;
pub mod login_repository;

pub use in_memory::InMemoryLoginStore;
pub use login_repository::PgLoginRepository;

use crate::error::PipelineResult;
use crate::models::PersistedLogin;
use serde::{Deserialize, Serialize};

/// What to do when a `user_id` already exists in the table.
///
/// A batch that was committed but not acknowledged is delivered again, so
/// the same rows reach the store twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Plain insert; a duplicate key fails and rolls back the whole batch
    Reject,
    /// Keep the stored row and silently skip the duplicate
    #[default]
    SkipExisting,
}

/// Batch-atomic writer for persisted logins
#[async_trait::async_trait]
pub trait LoginSink: Send + Sync {
    /// Insert every record in one transaction.
    ///
    /// Returns the number of rows actually inserted, which is lower than the
    /// batch length when `SkipExisting` drops duplicates.
    async fn persist(&self, batch: &[PersistedLogin]) -> PipelineResult<u64>;
}
