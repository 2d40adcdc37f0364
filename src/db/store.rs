//! Persistence of device state on top of the `device_events` log.
//!
//! Operations report every failure to the caller; whether a failure ends the
//! run is decided by the processor, not here.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::db::{queries, DbPool};
use crate::models::device::DeviceRecord;
use crate::models::device_event::DeviceEventRow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("generated timestamp `{0}` is not in a recognised format")]
    InvalidTimestamp(String),
}

#[allow(async_fn_in_trait)]
pub trait DeviceStore {
    /// Newest event for `device`, if any. Never writes.
    async fn try_fetch_latest(&self, device: &str) -> Result<Option<DeviceRecord>, StoreError>;

    /// Appends one raw event to the log.
    async fn append(&self, record: &DeviceRecord) -> Result<(), StoreError>;

    /// Overwrites speed, heading and position of the device's rows and
    /// returns how many rows changed. `generated` is not written.
    async fn update_current(&self, record: &DeviceRecord) -> Result<u64, StoreError>;

    /// Stores the first observation of a device that has no history yet.
    async fn initialize(&self, record: &DeviceRecord) -> Result<(), StoreError> {
        self.append(record).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl StoreConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

pub struct PgDeviceStore {
    pool: DbPool,
    config: StoreConfig,
}

impl PgDeviceStore {
    pub fn new(pool: DbPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }
}

impl DeviceStore for PgDeviceStore {
    async fn try_fetch_latest(&self, device: &str) -> Result<Option<DeviceRecord>, StoreError> {
        let row = bounded(
            "select latest device event",
            self.config.read_timeout,
            sqlx::query_as::<_, DeviceEventRow>(queries::SELECT_LATEST_EVENT)
                .bind(device)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(DeviceEventRow::into_record))
    }

    async fn append(&self, record: &DeviceRecord) -> Result<(), StoreError> {
        let generated = match &record.generated {
            Some(ts) => Some(
                ts.to_naive()
                    .ok_or_else(|| StoreError::InvalidTimestamp(ts.to_string()))?,
            ),
            None => None,
        };
        let (lat, long) = position_columns(record);

        bounded(
            "insert device event",
            self.config.write_timeout,
            sqlx::query(queries::INSERT_DEVICE_EVENT)
                .bind(&record.device)
                .bind(generated)
                .bind(record.speed)
                .bind(record.heading)
                .bind(lat)
                .bind(long)
                .execute(&self.pool),
        )
        .await?;

        debug!("Inserted event for device {}", record.device);
        Ok(())
    }

    async fn update_current(&self, record: &DeviceRecord) -> Result<u64, StoreError> {
        let (lat, long) = position_columns(record);

        let result = bounded(
            "update device state",
            self.config.write_timeout,
            sqlx::query(queries::UPDATE_CURRENT_STATE)
                .bind(&record.device)
                .bind(record.speed)
                .bind(record.heading)
                .bind(lat)
                .bind(long)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

/// An absent position is written as a NULL pair, never as zeros.
fn position_columns(record: &DeviceRecord) -> (Option<f64>, Option<f64>) {
    match record.position {
        Some(p) => (Some(p.lat), Some(p.long)),
        None => (None, None),
    }
}

async fn bounded<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StoreError::Timeout { operation, timeout }),
    }
}
