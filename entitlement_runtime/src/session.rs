//! Session context: who is acting, passed explicitly to every call.
//!
//! A `Session` holds identity only (id, email, role). Entitlement state
//! is never cached: every status display re-reads the account, so an
//! operator's extension is visible to the member immediately.
//!
//! Concurrency: `SharedLedger` serializes all operations behind a Mutex,
//! which makes `extend`'s read-modify-write atomic within the process.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::warn;

use entitlement_kernel::access::EntitlementStatus;
use entitlement_kernel::clock::Clock;
use entitlement_kernel::domain::{AccountId, EventId, MemberEntry, Role};
use entitlement_kernel::engine::MemberStatus;
use entitlement_kernel::event_log::StockReport;
use entitlement_kernel::store::LedgerStore;
use entitlement_kernel::{Ledger, LedgerError, LedgerResult};

/// Identity of a logged-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    account_id: AccountId,
    email: String,
    role: Role,
}

impl Session {
    /// Authenticate and open a session. `None` on bad credentials.
    pub fn login<S: LedgerStore, C: Clock>(
        ledger: &mut Ledger<S, C>,
        email: &str,
        password: &str,
    ) -> LedgerResult<Option<Self>> {
        let summary = ledger.authenticate(email, password)?;
        if summary.is_none() {
            warn!(email, "failed login");
        }
        Ok(summary.map(|s| Self {
            account_id: s.id,
            email: email.to_string(),
            role: s.role,
        }))
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn require_operator(&self) -> LedgerResult<()> {
        if self.role.is_operator() {
            Ok(())
        } else {
            Err(LedgerError::PermissionDenied)
        }
    }

    /// Current entitlement, re-read from the registry.
    /// `None` if the account was deleted since login.
    pub fn status<S: LedgerStore, C: Clock>(
        &self,
        ledger: &Ledger<S, C>,
    ) -> LedgerResult<Option<EntitlementStatus>> {
        ledger.status_of(self.account_id)
    }

    /// Change the session owner's password. Both entries must match.
    pub fn change_password<S: LedgerStore, C: Clock>(
        &self,
        ledger: &mut Ledger<S, C>,
        new_password: &str,
        confirmation: &str,
    ) -> LedgerResult<()> {
        if new_password != confirmation {
            return Err(LedgerError::InvalidInput("passwords do not match".into()));
        }
        ledger.set_password(self.account_id, new_password)
    }
}

/// Thread-safe ledger handle. Operator actions are checked against the
/// caller's session.
pub struct SharedLedger<S, C> {
    inner: Mutex<Ledger<S, C>>,
}

impl<S: LedgerStore, C: Clock> SharedLedger<S, C> {
    pub fn new(ledger: Ledger<S, C>) -> Self {
        Self {
            inner: Mutex::new(ledger),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ledger<S, C>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn login(&self, email: &str, password: &str) -> LedgerResult<Option<Session>> {
        Session::login(&mut *self.lock(), email, password)
    }

    pub fn status(&self, session: &Session) -> LedgerResult<Option<EntitlementStatus>> {
        session.status(&*self.lock())
    }

    pub fn change_password(
        &self,
        session: &Session,
        new_password: &str,
        confirmation: &str,
    ) -> LedgerResult<()> {
        session.change_password(&mut *self.lock(), new_password, confirmation)
    }

    pub fn create_member(&self, session: &Session, email: &str, password: &str) -> LedgerResult<AccountId> {
        session.require_operator()?;
        self.lock().create(email, password)
    }

    pub fn delete_member(&self, session: &Session, id: AccountId) -> LedgerResult<()> {
        session.require_operator()?;
        self.lock().delete(id)
    }

    pub fn extend(&self, session: &Session, id: AccountId) -> LedgerResult<NaiveDate> {
        session.require_operator()?;
        self.lock().extend(id)
    }

    pub fn list_members(&self, session: &Session) -> LedgerResult<Vec<MemberEntry>> {
        session.require_operator()?;
        self.lock().list_members()
    }

    pub fn member_overview(&self, session: &Session) -> LedgerResult<Vec<MemberStatus>> {
        session.require_operator()?;
        self.lock().member_overview()
    }

    pub fn record_bag_opened(&self, session: &Session) -> LedgerResult<EventId> {
        session.require_operator()?;
        self.lock().record_bag_opened()
    }

    pub fn record_counter_reading(&self, session: &Session, value: i64) -> LedgerResult<EventId> {
        session.require_operator()?;
        self.lock().record_counter_reading(value)
    }

    pub fn stock_report(&self, session: &Session, event_type: &str) -> LedgerResult<StockReport> {
        session.require_operator()?;
        self.lock().stock_report(event_type)
    }

    pub fn into_inner(self) -> Ledger<S, C> {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}
