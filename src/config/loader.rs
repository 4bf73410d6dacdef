//! Configuration Loader
//!
//! Layers defaults, an optional config file and environment variables into an
//! `IngestConfig`. The environment is passed in as a map so tests never touch
//! process-wide state.

use super::error::{ConfigResult, ConfigurationError};
use super::IngestConfig;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default config file stem, resolved relative to the working directory
const DEFAULT_CONFIG_FILE: &str = "config/login-ingest";

/// Variables understood without the `INGEST__` prefix
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("QUEUE_URL", "queue.queue_url"),
    ("ENDPOINT_URL", "queue.endpoint_url"),
    ("AWS_REGION", "queue.region"),
    ("DATABASE_URL", "database.url"),
    ("DB_URL", "database.url"),
];

/// Loaded configuration plus the environment it was resolved for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: IngestConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration from the process environment
    pub fn load() -> ConfigResult<ConfigManager> {
        Self::load_from_env(std::env::vars().collect())
    }

    /// Load configuration from an explicit set of environment variables
    pub fn load_from_env(env: HashMap<String, String>) -> ConfigResult<ConfigManager> {
        let environment = detect_environment(&env);

        let file_source = match env.get("INGEST_CONFIG_PATH") {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.is_file() {
                    return Err(ConfigurationError::config_file_not_found(path));
                }
                File::from(path.as_path()).required(true)
            }
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Self::build(file_source, &env)?;
        config.validate()?;

        info!(
            environment = %environment,
            queue_url = %config.queue.queue_url,
            endpoint_url = ?config.queue.endpoint_url,
            database_url = %config.database.masked_url(),
            batch_size = config.queue.batch_size,
            visibility_timeout_seconds = config.queue.visibility_timeout_seconds,
            conflict_policy = ?config.database.conflict_policy,
            "Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            environment,
        })
    }

    /// Load configuration from a specific file, still honoring `env`
    pub fn load_from_file(
        path: &Path,
        env: HashMap<String, String>,
    ) -> ConfigResult<ConfigManager> {
        let mut env = env;
        env.insert(
            "INGEST_CONFIG_PATH".to_string(),
            path.display().to_string(),
        );
        Self::load_from_env(env)
    }

    fn build<S>(file_source: S, env: &HashMap<String, String>) -> ConfigResult<IngestConfig>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = Config::builder()
            .set_default("queue.queue_url", "")?
            .set_default("queue.region", "us-east-1")?
            .set_default("queue.batch_size", 10)?
            .set_default("queue.visibility_timeout_seconds", 30)?
            .set_default("queue.wait_time_seconds", 0)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_seconds", 30)?
            .set_default("database.conflict_policy", "skip_existing")?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("INGEST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            );

        for (variable, key) in LEGACY_OVERRIDES {
            if let Some(value) = env.get(*variable).filter(|v| !v.is_empty()) {
                debug!(variable = %variable, key = %key, "Applying environment override");
                builder = builder.set_override(*key, value.as_str())?;
            }
        }

        Ok(builder.build()?.try_deserialize::<IngestConfig>()?)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn into_config(self) -> IngestConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

/// Environment name from `INGEST_ENV` or `APP_ENV`, defaulting to development
pub fn detect_environment(env: &HashMap<String, String>) -> String {
    env.get("INGEST_ENV")
        .or_else(|| env.get("APP_ENV"))
        .cloned()
        .unwrap_or_else(|| "development".to_string())
        .to_lowercase()
}
