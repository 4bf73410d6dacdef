//! # Orchestration
//!
//! The ingestion loop and the states it moves through.
//!
//! ## Flow
//!
//! ```text
//! Idle -> Fetching -> Transforming -> Persisting -> Acknowledging -> Fetching ...
//!            |                                            |
//!            +-> Done (empty fetch)                       +-> Done (batch limit)
//! ```
//!
//! Any active state can move to `Failed`; the in-flight batch is then left
//! unacknowledged and becomes visible again once its lease expires.

pub mod pipeline;
pub mod states;

pub use pipeline::{BatchOutcome, LoginPipeline, PipelineSettings, RunSummary};
pub use states::PipelineState;
