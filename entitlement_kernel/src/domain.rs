/// Cafe Ledger: Core Domain Types
///
/// Pure data. No behaviour, no storage access.
/// Expiry dates are kept as `YYYY-MM-DD` text so that corrupted stored
/// values survive a round-trip and can be reported.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Identifiers ────────────────────────────────────────────────────

/// Stable account identifier. Assigned by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable event identifier. Strictly increasing in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Accounts ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Operator,
}

impl Role {
    pub fn is_operator(self) -> bool {
        matches!(self, Role::Operator)
    }
}

/// A stored identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
    pub entitlement_expiry: Option<String>, // YYYY-MM-DD, None = never subscribed
}

/// Account fields supplied on insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
}

/// What a successful login (or a status refresh) yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: AccountId,
    pub role: Role,
    pub entitlement_expiry: Option<String>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            role: account.role,
            entitlement_expiry: account.entitlement_expiry.clone(),
        }
    }
}

/// One row of the member listing (operators excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub id: AccountId,
    pub email: String,
    pub entitlement_expiry: Option<String>,
}

impl From<&Account> for MemberEntry {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            entitlement_expiry: account.entitlement_expiry.clone(),
        }
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// A coffee bag was opened and loaded into the machine.
pub const BAG_OPENED: &str = "bag_opened";
/// The machine's cup counter was read.
pub const COUNTER_READING: &str = "counter_reading";

/// Immutable supply log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventRecord {
    pub id: EventId,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub counter_value: Option<i64>,
}

/// Event fields supplied on append; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub counter_value: Option<i64>,
}

// ── Policy ─────────────────────────────────────────────────────────

/// Length of one extension (one bag of coffee).
pub const DEFAULT_EXTENSION_DAYS: i64 = 21;
/// Remaining days at or below which a valid entitlement is flagged.
pub const DEFAULT_WARNING_DAYS: i64 = 3;

/// SHA-256 rounds applied to every new credential.
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

/// Tunables for the entitlement and credential rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub extension_days: i64,
    pub warning_days: i64,
    pub hash_iterations: u32,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            extension_days: DEFAULT_EXTENSION_DAYS,
            warning_days: DEFAULT_WARNING_DAYS,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
        }
    }
}

/// Result of grouping events by calendar week (Monday to Sunday).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyCount {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub count: usize,
}
