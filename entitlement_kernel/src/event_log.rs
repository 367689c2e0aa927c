/// Cafe Ledger: Event Log
///
/// Append-only supply events plus the read-side aggregations used for
/// reporting. Timestamps come from the clock, never from the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::clock::Clock;
use crate::dates::week_start;
use crate::domain::{EventId, EventRecord, NewEvent, WeeklyCount, COUNTER_READING};
use crate::error::LedgerResult;
use crate::store::LedgerStore;

/// Record an event stamped with the current time.
pub fn append<S: LedgerStore, C: Clock>(
    store: &mut S,
    clock: &C,
    event_type: &str,
    counter_value: Option<i64>,
) -> LedgerResult<EventId> {
    let id = store.append_event(NewEvent {
        event_type: event_type.to_string(),
        timestamp: clock.now(),
        counter_value,
    })?;
    info!(event = %id, event_type, ?counter_value, "event recorded");
    Ok(id)
}

/// Every event in append order.
pub fn all<S: LedgerStore>(store: &S) -> LedgerResult<Vec<EventRecord>> {
    Ok(store.load_events()?)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub fn filter_by_type<'a>(events: &'a [EventRecord], event_type: &str) -> Vec<&'a EventRecord> {
    events.iter().filter(|e| e.event_type == event_type).collect()
}

/// Count events of one type per calendar week (Monday to Sunday, UTC),
/// ascending by week. Weeks without events are omitted.
pub fn weekly_counts(events: &[EventRecord], event_type: &str) -> Vec<WeeklyCount> {
    let mut weeks: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    for event in filter_by_type(events, event_type) {
        *weeks
            .entry(week_start(event.timestamp.date_naive()))
            .or_insert(0) += 1;
    }

    weeks
        .into_iter()
        .map(|(start, count)| WeeklyCount {
            week_start: start,
            week_end: start + Duration::days(6),
            count,
        })
        .collect()
}

/// `(timestamp, value)` of every counter reading that carries a value.
pub fn counter_series(events: &[EventRecord]) -> Vec<(DateTime<Utc>, i64)> {
    filter_by_type(events, COUNTER_READING)
        .into_iter()
        .filter_map(|e| e.counter_value.map(|v| (e.timestamp, v)))
        .collect()
}

/// The reporting read: the full log plus weekly counts for one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReport {
    pub events: Vec<EventRecord>,
    pub weekly: Vec<WeeklyCount>,
}

pub fn stock_report<S: LedgerStore>(store: &S, event_type: &str) -> LedgerResult<StockReport> {
    let events = all(store)?;
    let weekly = weekly_counts(&events, event_type);
    Ok(StockReport { events, weekly })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BAG_OPENED;
    use chrono::{NaiveDate, TimeZone};

    fn event(id: i64, event_type: &str, y: i32, m: u32, d: u32, value: Option<i64>) -> EventRecord {
        EventRecord {
            id: EventId(id),
            event_type: event_type.to_string(),
            timestamp: Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap(),
            counter_value: value,
        }
    }

    #[test]
    fn test_weekly_counts_two_weeks() {
        // Tue 2024-01-02 and Sun 2024-01-07 share a week; Wed 2024-01-10 does not.
        let events = vec![
            event(1, BAG_OPENED, 2024, 1, 10, None),
            event(2, BAG_OPENED, 2024, 1, 2, None),
            event(3, COUNTER_READING, 2024, 1, 3, Some(120)),
            event(4, BAG_OPENED, 2024, 1, 7, None),
        ];
        let weekly = weekly_counts(&events, BAG_OPENED);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(weekly[0].week_end, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(weekly[0].count, 2);
        assert_eq!(weekly[1].week_start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(weekly[1].count, 1);
    }

    #[test]
    fn test_weekly_counts_empty_for_unknown_type() {
        let events = vec![event(1, BAG_OPENED, 2024, 1, 10, None)];
        assert!(weekly_counts(&events, "test_event").is_empty());
    }

    #[test]
    fn test_counter_series_skips_other_types_and_missing_values() {
        let events = vec![
            event(1, COUNTER_READING, 2024, 1, 1, Some(10)),
            event(2, BAG_OPENED, 2024, 1, 2, None),
            event(3, COUNTER_READING, 2024, 1, 3, None),
            event(4, COUNTER_READING, 2024, 1, 4, Some(42)),
        ];
        let series: Vec<i64> = counter_series(&events).into_iter().map(|(_, v)| v).collect();
        assert_eq!(series, vec![10, 42]);
    }
}
