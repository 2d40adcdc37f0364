use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::models::device::{DeviceRecord, Position};
use crate::models::timestamp::Timestamp;

/// One row of the append-only `device_events` log.
#[derive(Debug, FromRow)]
pub struct DeviceEventRow {
    pub device: String,
    pub generatedts: Option<NaiveDateTime>,
    pub speed: Option<f64>,
    pub heading: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DeviceEventRow {
    pub fn into_record(self) -> DeviceRecord {
        DeviceRecord {
            device: self.device,
            generated: self.generatedts.map(Timestamp::from_naive),
            heading: self.heading,
            position: Position::from_stored_columns(self.latitude, self.longitude),
            speed: self.speed,
        }
    }
}
