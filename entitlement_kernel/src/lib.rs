#![forbid(unsafe_code)]

//! Cafe Ledger: entitlement and account core.
//!
//! Credential checks, account registry, the entitlement extension rule,
//! the supply event log and the access gate. Storage is reached only
//! through the `LedgerStore` contract.

pub mod access;
pub mod clock;
pub mod credential;
pub mod dates;
pub mod domain;
pub mod engine;
pub mod entitlement;
pub mod error;
pub mod event_log;
pub mod invariants;
pub mod registry;
pub mod store;

pub use engine::Ledger;
pub use error::{LedgerError, LedgerResult, StoreError};
