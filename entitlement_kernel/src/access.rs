/// Cafe Ledger: Access Gate
///
/// Pure classification of an entitlement expiry against a calendar day.
/// Unparseable stored expiries are surfaced as `MalformedData`, never
/// silently treated as valid or expired.

use chrono::NaiveDate;

use crate::dates::{days_between, parse_expiry};

/// Three-way expiry classification plus the data-quality outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementStatus {
    /// Days left including today's; `Valid(0)` is the last day.
    Valid(i64),
    /// Days since the expiry date passed.
    Expired(i64),
    NeverSubscribed,
    /// The stored text is not a `YYYY-MM-DD` date.
    MalformedData(String),
}

/// Display tier derived from a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Nominal,
    Warning,
    Critical,
}

impl EntitlementStatus {
    /// True only when the member may take a coffee today.
    pub fn may_consume(&self) -> bool {
        matches!(self, EntitlementStatus::Valid(_))
    }

    /// `> warning_days` left is nominal, `0..=warning_days` a warning,
    /// everything else critical.
    pub fn severity(&self, warning_days: i64) -> Severity {
        match self {
            EntitlementStatus::Valid(n) if *n > warning_days => Severity::Nominal,
            EntitlementStatus::Valid(_) => Severity::Warning,
            _ => Severity::Critical,
        }
    }

    /// Remaining days, clamped at zero for anything not valid.
    pub fn days_remaining(&self) -> i64 {
        match self {
            EntitlementStatus::Valid(n) => *n,
            _ => 0,
        }
    }
}

/// Classify a stored expiry as of `today`.
pub fn status(entitlement_expiry: Option<&str>, today: NaiveDate) -> EntitlementStatus {
    let Some(raw) = entitlement_expiry else {
        return EntitlementStatus::NeverSubscribed;
    };
    match parse_expiry(raw) {
        Some(expiry) => {
            let remaining = days_between(today, expiry);
            if remaining >= 0 {
                EntitlementStatus::Valid(remaining)
            } else {
                EntitlementStatus::Expired(-remaining)
            }
        }
        None => EntitlementStatus::MalformedData(raw.to_string()),
    }
}
