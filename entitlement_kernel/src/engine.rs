/// Cafe Ledger: Engine
///
/// Top-level orchestrator. Owns a store, a clock and the policy, and
/// delegates each operation to its component module:
///
///   credentials + identity -> registry
///   extension rule         -> entitlement
///   supply events          -> event_log
///   status display         -> access

use chrono::NaiveDate;

use crate::access::{self, EntitlementStatus, Severity};
use crate::clock::{Clock, SystemClock};
use crate::domain::{
    AccountId, AccountSummary, EventId, EventRecord, LedgerPolicy, MemberEntry, BAG_OPENED,
    COUNTER_READING,
};
use crate::entitlement;
use crate::error::LedgerResult;
use crate::event_log::{self, StockReport};
use crate::registry;
use crate::store::LedgerStore;

/// One row of the operator's subscription overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStatus {
    pub member: MemberEntry,
    pub status: EntitlementStatus,
    pub severity: Severity,
    pub days_remaining: i64,
}

/// Stateless-between-calls ledger over a store.
pub struct Ledger<S, C = SystemClock> {
    store: S,
    clock: C,
    policy: LedgerPolicy,
}

impl<S: LedgerStore> Ledger<S, SystemClock> {
    /// Ledger on the wall clock with default policy.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock, LedgerPolicy::default())
    }
}

impl<S: LedgerStore, C: Clock> Ledger<S, C> {
    pub fn with_clock(store: S, clock: C, policy: LedgerPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // -- Account registry --------------------------------------------------

    pub fn authenticate(&mut self, email: &str, plaintext: &str) -> LedgerResult<Option<AccountSummary>> {
        registry::authenticate(&mut self.store, email, plaintext, self.policy.hash_iterations)
    }

    pub fn create(&mut self, email: &str, plaintext: &str) -> LedgerResult<AccountId> {
        registry::create(&mut self.store, email, plaintext, self.policy.hash_iterations)
    }

    pub fn delete(&mut self, id: AccountId) -> LedgerResult<()> {
        registry::delete(&mut self.store, id)
    }

    pub fn set_password(&mut self, id: AccountId, new_plaintext: &str) -> LedgerResult<()> {
        registry::set_password(&mut self.store, id, new_plaintext, self.policy.hash_iterations)
    }

    pub fn list_members(&self) -> LedgerResult<Vec<MemberEntry>> {
        registry::list_members(&self.store)
    }

    pub fn account_summary(&self, id: AccountId) -> LedgerResult<Option<AccountSummary>> {
        registry::account_summary(&self.store, id)
    }

    /// Idempotent; run on every start.
    pub fn bootstrap_operator(&mut self, email: &str, plaintext: &str) -> LedgerResult<bool> {
        registry::bootstrap_operator(&mut self.store, email, plaintext, self.policy.hash_iterations)
    }

    // -- Entitlement engine ------------------------------------------------

    /// Extend by the policy's default length.
    pub fn extend(&mut self, id: AccountId) -> LedgerResult<NaiveDate> {
        let days = self.policy.extension_days;
        self.extend_by(id, days)
    }

    pub fn extend_by(&mut self, id: AccountId, extension_days: i64) -> LedgerResult<NaiveDate> {
        entitlement::extend(&mut self.store, &self.clock, id, extension_days)
    }

    // -- Access gate -------------------------------------------------------

    /// Status of a stored expiry as of today.
    pub fn status(&self, entitlement_expiry: Option<&str>) -> EntitlementStatus {
        access::status(entitlement_expiry, self.clock.today())
    }

    /// Re-reads the account, so the answer is never stale.
    /// `None` if the account no longer exists.
    pub fn status_of(&self, id: AccountId) -> LedgerResult<Option<EntitlementStatus>> {
        Ok(self
            .account_summary(id)?
            .map(|s| self.status(s.entitlement_expiry.as_deref())))
    }

    pub fn member_overview(&self) -> LedgerResult<Vec<MemberStatus>> {
        let today = self.clock.today();
        Ok(self
            .list_members()?
            .into_iter()
            .map(|member| {
                let status = access::status(member.entitlement_expiry.as_deref(), today);
                MemberStatus {
                    severity: status.severity(self.policy.warning_days),
                    days_remaining: status.days_remaining(),
                    status,
                    member,
                }
            })
            .collect())
    }

    // -- Event log ---------------------------------------------------------

    pub fn append(&mut self, event_type: &str, counter_value: Option<i64>) -> LedgerResult<EventId> {
        event_log::append(&mut self.store, &self.clock, event_type, counter_value)
    }

    pub fn record_bag_opened(&mut self) -> LedgerResult<EventId> {
        self.append(BAG_OPENED, None)
    }

    pub fn record_counter_reading(&mut self, value: i64) -> LedgerResult<EventId> {
        self.append(COUNTER_READING, Some(value))
    }

    pub fn events(&self) -> LedgerResult<Vec<EventRecord>> {
        event_log::all(&self.store)
    }

    pub fn stock_report(&self, event_type: &str) -> LedgerResult<StockReport> {
        event_log::stock_report(&self.store, event_type)
    }
}
