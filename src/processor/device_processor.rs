use anyhow::{bail, Context};
use tracing::{debug, error, info, warn};

use crate::db::store::DeviceStore;
use crate::models::device::DeviceRecord;
use crate::models::timestamp::Timestamp;
use crate::processor::reconciler;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub record: DeviceRecord,
    /// True when this was the device's first observation.
    pub created: bool,
}

pub fn parse_record(payload: &[u8]) -> anyhow::Result<DeviceRecord> {
    let record: DeviceRecord =
        serde_json::from_slice(payload).context("unable to parse input record")?;

    if record.device.trim().is_empty() {
        bail!("input record has an empty `device`");
    }

    Ok(record)
}

/// Reconciles `incoming` with the device's stored state and persists the result.
///
/// Store failures are logged and never abort the run: the caller always gets
/// a best-effort record to print.
pub async fn process_record<S: DeviceStore>(store: &S, mut incoming: DeviceRecord) -> ProcessOutcome {
    if incoming.generated.is_none() {
        let now = Timestamp::now();
        debug!("Record for {} has no generated time, using {}", incoming.device, now);
        incoming.generated = Some(now);
    }

    info!("Processing record for device: {}", incoming.device);
    debug!("Incoming record: {:?}", incoming);

    // 1. Latest stored state
    let existing = match store.try_fetch_latest(&incoming.device).await {
        Ok(existing) => existing,
        Err(e) => {
            error!("Error reading state of {}: {}. Skipping persistence", incoming.device, e);
            return ProcessOutcome {
                record: incoming,
                created: false,
            };
        }
    };

    // 2. First observation: store it as-is
    let Some(existing) = existing else {
        if let Err(e) = store.initialize(&incoming).await {
            error!("Error storing first event for {}: {}", incoming.device, e);
        } else {
            info!("Stored first event for device {}", incoming.device);
        }
        return ProcessOutcome {
            record: incoming,
            created: true,
        };
    };

    // 3. Merge and overwrite current state
    let merged = reconciler::merge(&existing, incoming);

    match store.update_current(&merged).await {
        Ok(0) => warn!("Update for {} matched no rows", merged.device),
        Ok(rows) => info!("Updated {} row(s) for device {}", rows, merged.device),
        Err(e) => error!("Error updating state of {}: {}", merged.device, e),
    }

    ProcessOutcome {
        record: merged,
        created: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::StoreError;
    use crate::models::device::Position;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStore {
        existing: Option<DeviceRecord>,
        fail_reads: bool,
        fail_writes: bool,
        appended: RefCell<Vec<DeviceRecord>>,
        updated: RefCell<Vec<DeviceRecord>>,
    }

    impl MemoryStore {
        fn with_existing(record: DeviceRecord) -> Self {
            Self {
                existing: Some(record),
                ..Default::default()
            }
        }

        fn failure(operation: &'static str) -> StoreError {
            StoreError::Timeout {
                operation,
                timeout: Duration::from_secs(1),
            }
        }
    }

    impl DeviceStore for MemoryStore {
        async fn try_fetch_latest(&self, _device: &str) -> Result<Option<DeviceRecord>, StoreError> {
            if self.fail_reads {
                return Err(Self::failure("select"));
            }
            Ok(self.existing.clone())
        }

        async fn append(&self, record: &DeviceRecord) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(Self::failure("insert"));
            }
            self.appended.borrow_mut().push(record.clone());
            Ok(())
        }

        async fn update_current(&self, record: &DeviceRecord) -> Result<u64, StoreError> {
            if self.fail_writes {
                return Err(Self::failure("update"));
            }
            self.updated.borrow_mut().push(record.clone());
            Ok(1)
        }
    }

    fn output(record: &DeviceRecord) -> String {
        let mut printed = record.clone();
        printed.generated = None;
        serde_json::to_string(&printed).unwrap()
    }

    #[test]
    fn test_parse_record_tolerates_unreadable_coordinates() {
        let record =
            parse_record(br#"{"device":"A","position":{"lat":null,"long":null}}"#).unwrap();
        assert_eq!(record.position, Some(Position::new(0.0, 0.0)));

        let record =
            parse_record(br#"{"device":"A","position":{"lat":"north","long":"1"}}"#).unwrap();
        assert_eq!(record.position, Some(Position::new(0.0, 1.0)));

        let record = parse_record(br#"{"device":"A","position":{"lat":"1.5","long":2}}"#).unwrap();
        assert_eq!(record.position, Some(Position::new(1.5, 2.0)));
    }

    #[test]
    fn test_parse_record_rejects_bad_input() {
        assert!(parse_record(br#"{"device":"A","speed":5}"#).is_ok());
        assert!(parse_record(br#"{"device":"","speed":5}"#).is_err());
        assert!(parse_record(br#"{"device":"A","speed":"#).is_err());
        assert!(parse_record(b"[]").is_err());
    }

    #[tokio::test]
    async fn test_first_observation_is_stored_verbatim() {
        let store = MemoryStore::default();
        let incoming = parse_record(br#"{"device":"A","speed":5}"#).unwrap();

        let outcome = process_record(&store, incoming).await;

        assert!(outcome.created);
        assert_eq!(output(&outcome.record), r#"{"device":"A","speed":5}"#);
        let appended = store.appended.borrow();
        assert_eq!(appended.len(), 1);
        assert!(appended[0].generated.is_some());
        assert!(store.updated.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_newer_event_is_merged_and_updated() {
        let mut existing = DeviceRecord::new("A");
        existing.generated = Some(Timestamp::new("2024-01-01 00:00:00"));
        existing.speed = Some(5.0);
        existing.heading = Some(90);
        let store = MemoryStore::with_existing(existing);

        let incoming = parse_record(
            br#"{"device":"A","generated":"2024-01-02T00:00:00Z","heading":95}"#,
        )
        .unwrap();
        let outcome = process_record(&store, incoming).await;

        assert!(!outcome.created);
        assert_eq!(outcome.record.speed, Some(5.0));
        assert_eq!(outcome.record.heading, Some(95));
        assert_eq!(output(&outcome.record), r#"{"device":"A","heading":95,"speed":5}"#);
        assert!(store.appended.borrow().is_empty());
        assert_eq!(store.updated.borrow().as_slice(), &[outcome.record.clone()]);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_outputs_incoming() {
        let mut existing = DeviceRecord::new("A");
        existing.generated = Some(Timestamp::new("2024-01-01 00:00:00"));
        existing.speed = Some(5.0);
        existing.position = Some(Position::new(1.0, 2.0));
        let store = MemoryStore::with_existing(existing);

        let incoming =
            parse_record(br#"{"device":"A","generated":"2024-01-01 00:00:00","heading":10}"#)
                .unwrap();
        let outcome = process_record(&store, incoming.clone()).await;

        assert_eq!(outcome.record, incoming);
        assert_eq!(output(&outcome.record), r#"{"device":"A","heading":10}"#);
    }

    #[tokio::test]
    async fn test_write_failures_still_produce_output() {
        let mut store = MemoryStore::with_existing(DeviceRecord::new("A"));
        store.fail_writes = true;

        let incoming = parse_record(br#"{"device":"A","speed":3.25}"#).unwrap();
        let outcome = process_record(&store, incoming).await;
        assert_eq!(outcome.record.speed, Some(3.25));

        let store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let incoming = parse_record(br#"{"device":"B","heading":1}"#).unwrap();
        let outcome = process_record(&store, incoming).await;
        assert!(outcome.created);
        assert_eq!(outcome.record.heading, Some(1));
    }

    #[tokio::test]
    async fn test_read_failure_skips_persistence() {
        let store = MemoryStore {
            fail_reads: true,
            ..Default::default()
        };
        let incoming = parse_record(br#"{"device":"A","speed":5}"#).unwrap();

        let outcome = process_record(&store, incoming).await;

        assert!(!outcome.created);
        assert_eq!(output(&outcome.record), r#"{"device":"A","speed":5}"#);
        assert!(store.appended.borrow().is_empty());
        assert!(store.updated.borrow().is_empty());
    }
}
