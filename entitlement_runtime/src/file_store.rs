//! Durable `LedgerStore` on the local filesystem.
//!
//! Directory layout:
//!   <data_dir>/accounts.json   checksummed account snapshot
//!   <data_dir>/events.log      length-prefixed protobuf event frames
//!   <data_dir>/.lock           held exclusively while a store is open
//!
//! One `FileStore` per data directory at a time, across processes. The
//! in-memory tables are the only copy read before a write, so a second
//! writer would hand out duplicate ids and overwrite snapshots.
//!
//! Persist-before-apply: every mutation is written and fsynced first,
//! and only then becomes visible in memory. A failed write leaves the
//! in-memory tables unchanged.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tracing::{info, warn};

use entitlement_kernel::domain::{Account, AccountId, EventId, EventRecord, NewAccount, NewEvent};
use entitlement_kernel::store::{AccountTable, EventTable, LedgerStore};
use entitlement_kernel::StoreError;

use crate::event_store::EventStore;
use crate::proto_bridge::{proto_to_record, record_to_proto};
use crate::snapshot::{load_accounts, save_accounts};

pub const ACCOUNTS_FILE: &str = "accounts.json";
pub const EVENTS_FILE: &str = "events.log";
pub const LOCK_FILE: &str = ".lock";

pub struct FileStore {
    accounts_path: PathBuf,
    accounts: AccountTable,
    events: EventTable,
    log: EventStore,
    // Released when the store is dropped.
    _lock: File,
}

impl FileStore {
    /// Open (or create) a store rooted at `data_dir`.
    ///
    /// Fails with `StoreError::Locked` while another store holds the
    /// directory. Fails to load if either file exists but is corrupt.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let lock = lock_data_dir(data_dir)?;

        let accounts_path = data_dir.join(ACCOUNTS_FILE);
        let accounts = load_accounts(&accounts_path)?.unwrap_or_default();

        let log = EventStore::open(&data_dir.join(EVENTS_FILE))?;
        let records = log
            .load_all_events()?
            .iter()
            .map(proto_to_record)
            .collect::<Result<Vec<_>, _>>()?;
        let events = EventTable::from_records(records)?;

        info!(
            dir = %data_dir.display(),
            accounts = accounts.accounts.len(),
            events = events.records().len(),
            "file store opened"
        );
        Ok(Self {
            accounts_path,
            accounts,
            events,
            log,
            _lock: lock,
        })
    }

    /// Apply `change` to a copy of the table, persist it, then swap it in.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut AccountTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut next = self.accounts.clone();
        let out = change(&mut next)?;
        save_accounts(&self.accounts_path, &next)?;
        self.accounts = next;
        Ok(out)
    }

    /// Write raw expiry text, bypassing every rule. Simulates corrupted data.
    pub fn force_expiry(&mut self, id: AccountId, raw: &str) -> Result<(), StoreError> {
        self.commit(|table| {
            table.set_expiry(id, raw);
            Ok(())
        })
    }
}

fn lock_data_dir(data_dir: &Path) -> Result<File, StoreError> {
    let path = data_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    if let Err(err) = FileExt::try_lock_exclusive(&file) {
        warn!(dir = %data_dir.display(), error = %err, "data directory already locked");
        return Err(StoreError::Locked(data_dir.display().to_string()));
    }
    Ok(file)
}

impl LedgerStore for FileStore {
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.find_by_email(email).cloned())
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(id).cloned())
    }

    fn insert_account(&mut self, account: NewAccount) -> Result<AccountId, StoreError> {
        self.commit(|table| table.insert(account))
    }

    fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        if self.accounts.get(id).is_none() {
            return Ok(());
        }
        self.commit(|table| {
            table.delete(id);
            Ok(())
        })
    }

    fn update_credential(
        &mut self,
        id: AccountId,
        credential_hash: &str,
    ) -> Result<(), StoreError> {
        if self.accounts.get(id).is_none() {
            return Ok(());
        }
        self.commit(|table| {
            table.set_credential(id, credential_hash);
            Ok(())
        })
    }

    fn update_expiry(&mut self, id: AccountId, expiry: &str) -> Result<(), StoreError> {
        if self.accounts.get(id).is_none() {
            return Ok(());
        }
        self.commit(|table| {
            table.set_expiry(id, expiry);
            Ok(())
        })
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.accounts.clone())
    }

    fn append_event(&mut self, event: NewEvent) -> Result<EventId, StoreError> {
        let record = self.events.prepare(event);
        self.log.append_event(&record_to_proto(&record))?;
        let id = record.id;
        self.events.push(record)?;
        Ok(id)
    }

    fn load_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self.events.records().to_vec())
    }
}
