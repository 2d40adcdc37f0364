use crate::models::timestamp::Timestamp;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Latest known telemetry state of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_f64_option"
    )]
    pub speed: Option<f64>,
}

#[cfg(test)]
impl DeviceRecord {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            generated: None,
            heading: None,
            position: None,
            speed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "parse_f64", serialize_with = "serialize_f64")]
    pub lat: f64,
    #[serde(default, deserialize_with = "parse_f64", serialize_with = "serialize_f64")]
    pub long: f64,
}

impl Position {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Builds a position from the nullable `latitude`/`longitude` columns.
    ///
    /// `(0.0, 0.0)` is the sentinel historical rows use for "no position",
    /// so a real fix at null island cannot be represented.
    pub fn from_stored_columns(lat: Option<f64>, long: Option<f64>) -> Option<Self> {
        match (lat, long) {
            (Some(lat), Some(long)) if lat == 0.0 && long == 0.0 => None,
            (Some(lat), Some(long)) => Some(Self::new(lat, long)),
            _ => None,
        }
    }
}

/// Coordinates arrive either as JSON numbers or as numeric strings.
///
/// Anything unreadable (`null`, a bad string, an object) becomes `0.0`
/// instead of rejecting the whole record.
fn parse_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
        Other(IgnoredAny),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::Float(f) => Ok(f),
        StringOrFloat::String(s) => {
            if s.trim().is_empty() {
                return Ok(0.0);
            }
            match s.trim().parse::<f64>() {
                Ok(f) => Ok(f),
                Err(e) => {
                    warn!("Unable to parse coordinate '{}': {}", s, e);
                    Ok(0.0)
                }
            }
        }
        StringOrFloat::Other(_) => Ok(0.0),
    }
}

// Integral values print without a fractional part (`5`, not `5.0`).
fn serialize_f64<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_f64_option<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serialize_f64(v, serializer),
        None => serializer.serialize_none(),
    }
}
