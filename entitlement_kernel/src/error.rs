use thiserror::Error;

use crate::domain::AccountId;

/// Failures raised by a persistence adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("an account with email {0:?} already exists")]
    DuplicateEmail(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("encoding failed: {0}")]
    Codec(String),
    /// Another handle already owns the storage location.
    #[error("{0} is in use by another ledger process")]
    Locked(String),
}

/// Failures surfaced by ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("an account with email {0:?} already exists")]
    DuplicateEmail(String),
    #[error("account {0} not found")]
    NotFound(AccountId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid extension of {0} days")]
    InvalidExtension(i64),
    #[error("operation requires an operator account")]
    PermissionDenied,
    #[error("credential error: {0}")]
    Credential(String),
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(email) => LedgerError::DuplicateEmail(email),
            other => LedgerError::Storage(other),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
