//! Proto ↔ Kernel conversion bridge for event records.

use chrono::DateTime;

use entitlement_kernel::domain::{EventId, EventRecord};
use entitlement_kernel::StoreError;

use crate::proto_types::ProtoEventRecord;

/// Convert a kernel event record to its wire form.
pub fn record_to_proto(record: &EventRecord) -> ProtoEventRecord {
    ProtoEventRecord {
        id: record.id.0,
        event_type: record.event_type.clone(),
        timestamp_micros: record.timestamp.timestamp_micros(),
        counter_value: record.counter_value,
    }
}

/// Convert a decoded frame back to a kernel event record.
///
/// Fails on timestamps outside chrono's representable range.
pub fn proto_to_record(proto: &ProtoEventRecord) -> Result<EventRecord, StoreError> {
    let timestamp = DateTime::from_timestamp_micros(proto.timestamp_micros).ok_or_else(|| {
        StoreError::Corrupt(format!(
            "event {} has out-of-range timestamp {}",
            proto.id, proto.timestamp_micros
        ))
    })?;

    Ok(EventRecord {
        id: EventId(proto.id),
        event_type: proto.event_type.clone(),
        timestamp,
        counter_value: proto.counter_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_counter_value_absent_stays_absent() {
        let record = EventRecord {
            id: EventId(3),
            event_type: "bag_opened".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap(),
            counter_value: None,
        };
        let back = proto_to_record(&record_to_proto(&record)).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_out_of_range_timestamp_is_corrupt() {
        let proto = ProtoEventRecord {
            id: 1,
            event_type: "x".to_string(),
            timestamp_micros: i64::MAX,
            counter_value: Some(0),
        };
        assert!(matches!(proto_to_record(&proto), Err(StoreError::Corrupt(_))));
    }
}
