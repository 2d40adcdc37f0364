//! Field-level reconciliation of an incoming observation with the stored one.
//!
//! For each of heading, speed and position:
//!
//! 1. incoming lacks the field, existing has it: take existing
//! 2. both have it and incoming is strictly older: take existing
//! 3. otherwise keep incoming
//!
//! A `generated` that is missing or unparseable on either side makes the
//! ordering indeterminate, and incoming is treated as not older.

use chrono::NaiveDateTime;

use crate::models::device::DeviceRecord;
use crate::models::timestamp::Timestamp;

/// Merges `incoming` into `existing` and returns the record that becomes current.
pub fn merge(existing: &DeviceRecord, mut incoming: DeviceRecord) -> DeviceRecord {
    // Same textual timestamp means the same event was delivered again.
    if existing.generated.is_some() && existing.generated == incoming.generated {
        return incoming;
    }

    let existing_time = parsed(&existing.generated);
    let incoming_is_older = match (parsed(&incoming.generated), existing_time) {
        (Some(incoming_time), Some(existing_time)) => incoming_time < existing_time,
        _ => false,
    };

    incoming.heading = pick(existing.heading, incoming.heading, incoming_is_older);
    incoming.speed = pick(existing.speed, incoming.speed, incoming_is_older);
    incoming.position = pick(existing.position, incoming.position, incoming_is_older);

    if incoming_is_older {
        incoming.generated = existing_time.map(Timestamp::from_naive);
    }

    incoming
}

fn pick<T>(existing: Option<T>, incoming: Option<T>, incoming_is_older: bool) -> Option<T> {
    match (existing, incoming) {
        (Some(existing), None) => Some(existing),
        (Some(existing), Some(_)) if incoming_is_older => Some(existing),
        (_, incoming) => incoming,
    }
}

fn parsed(generated: &Option<Timestamp>) -> Option<NaiveDateTime> {
    generated.as_ref().and_then(Timestamp::to_naive)
}
