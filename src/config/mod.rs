//! # Ingestion Configuration
//!
//! A single `IngestConfig` is built once at startup and handed to the
//! message source, the repository and the pipeline. Core code never reads
//! the process environment itself.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use login_ingest::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let batch_size = manager.config().queue.batch_size;
//! let url = manager.config().database.masked_url();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::database::ConflictPolicy;
use crate::messaging::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Queue the login events are read from
    pub queue: QueueConfig,

    /// Database the logins are written to
    pub database: DatabaseConfig,

    /// Loop behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// SQS connection and lease settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    pub queue_url: String,
    pub region: String,
    /// Alternate service endpoint, e.g. LocalStack
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Messages requested per fetch, at most 10
    pub batch_size: i32,
    /// Lease length applied to every fetched message
    pub visibility_timeout_seconds: i32,
    /// Long-poll wait, 0 returns immediately so a drained queue ends the run
    #[serde(default)]
    pub wait_time_seconds: i32,
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub conflict_policy: ConflictPolicy,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Connection string with the password replaced, safe to log
    pub fn masked_url(&self) -> String {
        mask_url_password(&self.url)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Stop after this many non-empty batches. `None` runs until drained.
    #[serde(default)]
    pub max_batches: Option<u64>,
}

impl IngestConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue.queue_url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queue.queue_url",
                "queue configuration",
            ));
        }

        if !(1..=MAX_BATCH_SIZE).contains(&self.queue.batch_size) {
            return Err(ConfigurationError::invalid_value(
                "queue.batch_size",
                self.queue.batch_size.to_string(),
                format!("batch size must be between 1 and {MAX_BATCH_SIZE}"),
            ));
        }

        if self.queue.visibility_timeout_seconds <= 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.visibility_timeout_seconds",
                self.queue.visibility_timeout_seconds.to_string(),
                "visibility timeout must be greater than 0",
            ));
        }

        if !(0..=20).contains(&self.queue.wait_time_seconds) {
            return Err(ConfigurationError::invalid_value(
                "queue.wait_time_seconds",
                self.queue.wait_time_seconds.to_string(),
                "wait time must be between 0 and 20 seconds",
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.url",
                "database configuration",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.pipeline.max_batches == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "pipeline.max_batches",
                "0",
                "omit the limit instead of setting it to 0",
            ));
        }

        Ok(())
    }
}

fn mask_url_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let Some(at) = url[authority_start..].find('@').map(|i| i + authority_start) else {
        return url.to_string();
    };
    match url[authority_start..at].find(':') {
        Some(colon) => format!("{}:***{}", &url[..authority_start + colon], &url[at..]),
        None => url.to_string(),
    }
}
