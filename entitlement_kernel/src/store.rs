//! Persistence contract consumed by the ledger, plus the in-memory tables
//! every adapter builds on.
//!
//! Rules:
//!   - Email is unique (exact, case-sensitive match)
//!   - Ids auto-increment and are never reused, even after delete
//!   - Updates and deletes on unknown ids succeed and change nothing
//!   - Events are append-only

use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountId, EventId, EventRecord, NewAccount, NewEvent};
use crate::error::StoreError;

/// Narrow read/write contract the core needs from durable storage.
///
/// Each call is one atomic unit. Callers holding `&mut self` get
/// read-modify-write atomicity for free.
pub trait LedgerStore {
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Fails with `StoreError::DuplicateEmail` without touching state.
    fn insert_account(&mut self, account: NewAccount) -> Result<AccountId, StoreError>;

    fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError>;

    fn update_credential(&mut self, id: AccountId, credential_hash: &str)
        -> Result<(), StoreError>;

    fn update_expiry(&mut self, id: AccountId, expiry: &str) -> Result<(), StoreError>;

    /// All accounts, ascending by id.
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    fn append_event(&mut self, event: NewEvent) -> Result<EventId, StoreError>;

    /// All events, ascending by id.
    fn load_events(&self) -> Result<Vec<EventRecord>, StoreError>;
}

// ── Account table ──────────────────────────────────────────────────

/// The account table: rows ordered by id plus the next id to hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountTable {
    pub next_id: i64,
    pub accounts: Vec<Account>,
}

impl Default for AccountTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            accounts: Vec::new(),
        }
    }
}

impl AccountTable {
    pub fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.email == email)
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    pub fn insert(&mut self, new: NewAccount) -> Result<AccountId, StoreError> {
        if self.find_by_email(&new.email).is_some() {
            return Err(StoreError::DuplicateEmail(new.email));
        }
        let id = AccountId(self.next_id);
        self.next_id += 1;
        self.accounts.push(Account {
            id,
            email: new.email,
            credential_hash: new.credential_hash,
            role: new.role,
            entitlement_expiry: None,
        });
        Ok(id)
    }

    /// Returns whether a row was removed.
    pub fn delete(&mut self, id: AccountId) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != id);
        self.accounts.len() != before
    }

    /// Returns whether a row matched.
    pub fn set_credential(&mut self, id: AccountId, credential_hash: &str) -> bool {
        match self.get_mut(id) {
            Some(account) => {
                account.credential_hash = credential_hash.to_string();
                true
            }
            None => false,
        }
    }

    /// Returns whether a row matched.
    pub fn set_expiry(&mut self, id: AccountId, expiry: &str) -> bool {
        match self.get_mut(id) {
            Some(account) => {
                account.entitlement_expiry = Some(expiry.to_string());
                true
            }
            None => false,
        }
    }
}

// ── Event table ────────────────────────────────────────────────────

/// Append-only event rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTable {
    events: Vec<EventRecord>,
}

impl EventTable {
    /// Rebuild from stored records, rejecting gaps and reordering.
    pub fn from_records(events: Vec<EventRecord>) -> Result<Self, StoreError> {
        let mut table = Self::default();
        for record in events {
            table.push(record)?;
        }
        Ok(table)
    }

    pub fn next_id(&self) -> EventId {
        EventId(self.events.last().map(|e| e.id.0).unwrap_or(0) + 1)
    }

    /// Assign the next id without recording anything yet.
    pub fn prepare(&self, new: NewEvent) -> EventRecord {
        EventRecord {
            id: self.next_id(),
            event_type: new.event_type,
            timestamp: new.timestamp,
            counter_value: new.counter_value,
        }
    }

    /// Record a prepared event. Ids must keep increasing.
    pub fn push(&mut self, record: EventRecord) -> Result<(), StoreError> {
        let expected = self.next_id();
        if record.id != expected {
            return Err(StoreError::Corrupt(format!(
                "event id violation: expected {}, got {}",
                expected, record.id
            )));
        }
        self.events.push(record);
        Ok(())
    }

    pub fn append(&mut self, new: NewEvent) -> Result<EventRecord, StoreError> {
        let record = self.prepare(new);
        self.push(record.clone())?;
        Ok(record)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.events
    }
}

// ── In-memory adapter ──────────────────────────────────────────────

/// Volatile store. Reference adapter for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    accounts: AccountTable,
    events: EventTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write raw expiry text, bypassing every rule. Simulates corrupted data.
    pub fn force_expiry(&mut self, id: AccountId, raw: &str) {
        self.accounts.set_expiry(id, raw);
    }

    pub fn accounts(&self) -> &AccountTable {
        &self.accounts
    }
}

impl LedgerStore for MemoryStore {
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.find_by_email(email).cloned())
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(id).cloned())
    }

    fn insert_account(&mut self, account: NewAccount) -> Result<AccountId, StoreError> {
        self.accounts.insert(account)
    }

    fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        self.accounts.delete(id);
        Ok(())
    }

    fn update_credential(
        &mut self,
        id: AccountId,
        credential_hash: &str,
    ) -> Result<(), StoreError> {
        self.accounts.set_credential(id, credential_hash);
        Ok(())
    }

    fn update_expiry(&mut self, id: AccountId, expiry: &str) -> Result<(), StoreError> {
        self.accounts.set_expiry(id, expiry);
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.accounts.clone())
    }

    fn append_event(&mut self, event: NewEvent) -> Result<EventId, StoreError> {
        Ok(self.events.append(event)?.id)
    }

    fn load_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self.events.records().to_vec())
    }
}
