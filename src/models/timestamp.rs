use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format used on the command line and in printed output.
pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A `generated` value as it travelled through the system.
///
/// The received text is kept because duplicate delivery is detected by
/// textual equality. Parsing accepts the wire format, the same layout with a
/// `T` separator, and RFC 3339 (normalized to UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn now() -> Self {
        Self::from_naive(Utc::now().naive_utc())
    }

    /// Adapter for values read from the `generatedts` column.
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value.format(WIRE_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Adapter for values bound to the `generatedts` column.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let raw = self.0.trim();
        NaiveDateTime::parse_from_str(raw, WIRE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|t| t.naive_utc())
            })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
