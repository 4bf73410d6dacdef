//! PostgreSQL repository for the `user_logins` table.

use super::{ConflictPolicy, LoginSink};
use crate::config::DatabaseConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::hashing::Digest;
use crate::models::PersistedLogin;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

const INSERT_LOGIN: &str = r#"
    INSERT INTO user_logins
        (user_id, device_type, masked_ip, masked_device_id, locale, app_version, create_date)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

const INSERT_LOGIN_SKIP_EXISTING: &str = r#"
    INSERT INTO user_logins
        (user_id, device_type, masked_ip, masked_device_id, locale, app_version, create_date)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (user_id) DO NOTHING
"#;

/// Row shape as read back from `user_logins`
#[derive(Debug, Clone, FromRow)]
struct UserLoginRow {
    user_id: String,
    device_type: String,
    masked_ip: String,
    masked_device_id: String,
    locale: String,
    app_version: i32,
    create_date: NaiveDate,
}

impl From<UserLoginRow> for PersistedLogin {
    fn from(row: UserLoginRow) -> Self {
        PersistedLogin {
            user_id: row.user_id,
            device_type: row.device_type,
            masked_ip: Digest::from_stored(row.masked_ip),
            masked_device_id: Digest::from_stored(row.masked_device_id),
            locale: row.locale,
            app_version: row.app_version,
            create_date: row.create_date,
        }
    }
}

/// `LoginSink` backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgLoginRepository {
    pool: PgPool,
    conflict_policy: ConflictPolicy,
}

impl PgLoginRepository {
    /// Open a pool using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> PipelineResult<Self> {
        info!(database_url = %config.masked_url(), max_connections = config.max_connections, "Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        Ok(Self::new(pool, config.conflict_policy))
    }

    /// Use an existing pool (BYOP - Bring Your Own Pool)
    pub fn new(pool: PgPool, conflict_policy: ConflictPolicy) -> Self {
        Self {
            pool,
            conflict_policy,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    pub async fn health_check(&self) -> PipelineResult<bool> {
        let row = sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.pool)
            .await?;
        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    /// Look up a stored login by its natural key
    pub async fn find_by_user_id(&self, user_id: &str) -> PipelineResult<Option<PersistedLogin>> {
        let row = sqlx::query_as::<_, UserLoginRow>(
            r#"
            SELECT user_id, device_type, masked_ip, masked_device_id, locale, app_version, create_date
            FROM user_logins
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PersistedLogin::from))
    }

    pub async fn count(&self) -> PipelineResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_logins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn insert_statement(&self) -> &'static str {
        match self.conflict_policy {
            ConflictPolicy::Reject => INSERT_LOGIN,
            ConflictPolicy::SkipExisting => INSERT_LOGIN_SKIP_EXISTING,
        }
    }
}

#[async_trait::async_trait]
impl LoginSink for PgLoginRepository {
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn persist(&self, batch: &[PersistedLogin]) -> PipelineResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let statement = self.insert_statement();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for login in batch {
            let result = sqlx::query(statement)
                .bind(&login.user_id)
                .bind(&login.device_type)
                .bind(login.masked_ip.as_str())
                .bind(login.masked_device_id.as_str())
                .bind(&login.locale)
                .bind(login.app_version)
                .bind(login.create_date)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) => {
                    warn!(user_id = %login.user_id, error = %e, "Insert failed, rolling back batch");
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Explicit rollback failed, connection drop will discard the transaction");
                    }
                    return Err(PipelineError::from(e));
                }
            }
        }

        tx.commit().await?;

        debug!(
            inserted,
            skipped = batch.len() as u64 - inserted,
            duration_ms = started.elapsed().as_millis() as u64,
            "Committed login batch"
        );
        Ok(inserted)
    }
}
