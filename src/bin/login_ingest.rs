//! # Login Ingest
//!
//! Drains the configured queue into PostgreSQL and exits.
//!
//! Configuration comes from `INGEST__*` environment variables, an optional
//! config file (`INGEST_CONFIG_PATH`) and the legacy `QUEUE_URL`,
//! `ENDPOINT_URL`, `AWS_REGION` and `DATABASE_URL` variables. Exits non-zero
//! when the run halts on an error.

use anyhow::Context;
use login_ingest::config::ConfigManager;
use login_ingest::database::PgLoginRepository;
use login_ingest::logging::init_structured_logging;
use login_ingest::messaging::SqsMessageSource;
use login_ingest::orchestration::LoginPipeline;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_structured_logging();

    match run().await {
        Ok(()) => info!("Login ingest exited cleanly"),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Login ingest failed");
            process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let manager = ConfigManager::load().context("failed to load configuration")?;
    let config = manager.config();

    info!(
        environment = %manager.environment(),
        queue_url = %config.queue.queue_url,
        database = %config.database.masked_url(),
        "Configuration loaded"
    );

    let source = Arc::new(SqsMessageSource::new(&config.queue).await);
    let sink = Arc::new(
        PgLoginRepository::connect(&config.database)
            .await
            .context("failed to connect to database")?,
    );

    let mut pipeline = LoginPipeline::from_config(source, sink, config);
    let summary = pipeline.run().await.with_context(|| {
        let progress = pipeline.summary();
        format!(
            "pipeline halted in state {} after {} batches",
            pipeline.state(),
            progress.batches
        )
    })?;

    info!(
        batches = summary.batches,
        messages_persisted = summary.messages_persisted,
        rows_inserted = summary.rows_inserted,
        messages_acknowledged = summary.messages_acknowledged,
        final_state = %summary.final_state,
        "Run summary"
    );
    Ok(())
}
