/// Cafe Ledger: Calendar Date Primitives
///
/// Expiry dates are whole calendar days. No time component, no time zone.
/// Stored text format is fixed: `YYYY-MM-DD`.

use chrono::{Datelike, Days, NaiveDate};

/// Storage format of an entitlement expiry.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored expiry. `None` means the text is not a valid date.
///
/// Whitespace anywhere makes the text malformed.
pub fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    if raw.chars().any(char::is_whitespace) {
        return None;
    }
    NaiveDate::parse_from_str(raw, EXPIRY_FORMAT).ok()
}

/// Render a date in the storage format.
pub fn format_expiry(date: NaiveDate) -> String {
    date.format(EXPIRY_FORMAT).to_string()
}

/// `date + days`, or `None` if `days` is negative or the result overflows.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let days = u64::try_from(days).ok()?;
    date.checked_add_days(Days::new(days))
}

/// Signed whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = i64::from(date.weekday().num_days_from_monday());
    date - chrono::Duration::days(offset)
}
