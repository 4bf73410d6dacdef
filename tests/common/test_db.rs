//! PostgreSQL fixtures. Tests using them return early when
//! `TEST_DATABASE_URL` is not set.

#![allow(dead_code)]

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const USER_LOGINS_DDL: &str = include_str!("../../sql/user_logins.sql");

/// Generate a unique name for test data
pub fn unique_name(prefix: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{timestamp}_{}", &suffix[..8])
}

/// Single-connection pool scoped to a fresh schema holding `user_logins`
pub async fn isolated_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            println!("Skipping PostgreSQL test - TEST_DATABASE_URL not set");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");

    let schema = unique_name("login_ingest_test");
    sqlx::raw_sql(&format!(
        "CREATE SCHEMA {schema}; SET search_path TO {schema};"
    ))
    .execute(&pool)
    .await
    .expect("create test schema");

    sqlx::raw_sql(USER_LOGINS_DDL)
        .execute(&pool)
        .await
        .expect("create user_logins table");

    Some(pool)
}
