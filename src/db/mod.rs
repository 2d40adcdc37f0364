use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

use crate::config::AppConfig;

pub mod queries;
pub mod store;

pub type DbPool = Pool<Postgres>;

/// One record per run, so a single connection is enough.
pub async fn init_pool(config: &AppConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.connect_timeout())
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to ping Postgres")?;

    Ok(pool)
}

/// Creates the event table and its lookup index when missing.
pub async fn ensure_schema(pool: &DbPool, timeout: Duration) -> Result<()> {
    tokio::time::timeout(timeout, async {
        sqlx::query(queries::CREATE_DEVICE_EVENTS)
            .execute(pool)
            .await
            .context("error creating `device_events` table")?;
        sqlx::query(queries::CREATE_DEVICE_EVENTS_INDEX)
            .execute(pool)
            .await
            .context("error creating `device_events` index")?;
        Ok::<_, anyhow::Error>(())
    })
    .await
    .with_context(|| format!("schema setup timed out after {:?}", timeout))??;

    Ok(())
}
