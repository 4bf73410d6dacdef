#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Login Ingest
//!
//! Drains login events from a visibility-timeout queue into PostgreSQL.
//!
//! ## Overview
//!
//! Each batch is leased from the queue, parsed and masked, written to the
//! `user_logins` table inside a single transaction, and only then deleted from
//! the queue. Delivery is at-least-once: a batch that fails anywhere before
//! acknowledgment is redelivered after its lease expires.
//!
//! ## Module Organization
//!
//! - [`messaging`] - Queue access behind the [`MessageSource`] trait (SQS and in-memory)
//! - [`transform`] - Body parsing, field masking and version encoding
//! - [`hashing`] - SHA-256 digests for masked fields
//! - [`database`] - Transactional batch writes behind the [`LoginSink`] trait
//! - [`orchestration`] - The fetch, transform, persist, acknowledge loop
//! - [`config`] - Layered configuration (defaults, file, environment)
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use login_ingest::config::ConfigManager;
//! use login_ingest::database::PgLoginRepository;
//! use login_ingest::messaging::SqsMessageSource;
//! use login_ingest::orchestration::LoginPipeline;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let source = Arc::new(SqsMessageSource::new(&config.queue).await);
//! let sink = Arc::new(PgLoginRepository::connect(&config.database).await?);
//!
//! let summary = LoginPipeline::from_config(source, sink, config).run().await?;
//! println!("persisted {} messages", summary.messages_persisted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests; PostgreSQL tests need TEST_DATABASE_URL
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod transform;

pub use config::{ConfigManager, DatabaseConfig, IngestConfig, QueueConfig};
pub use database::{ConflictPolicy, LoginSink};
pub use error::{PipelineError, PipelineResult};
pub use hashing::{digest, Digest};
pub use messaging::MessageSource;
pub use models::{AckEntry, AckFailure, LoginEventInput, PersistedLogin, RawMessage};
pub use orchestration::{LoginPipeline, PipelineSettings, PipelineState, RunSummary};
pub use transform::Transformer;
