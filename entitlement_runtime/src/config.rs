use std::path::PathBuf;

use entitlement_kernel::domain::{
    LedgerPolicy, DEFAULT_EXTENSION_DAYS, DEFAULT_HASH_ITERATIONS, DEFAULT_WARNING_DAYS,
};
use entitlement_kernel::registry::{DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD};
use entitlement_kernel::LedgerError;

/// Data directory used when none is configured.
pub const DEFAULT_DATA_DIR: &str = "ledger-data";

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub data_dir: PathBuf,
    pub extension_days: i64,
    pub warning_days: i64,
    pub hash_iterations: u32,
    pub operator_email: String,
    pub operator_password: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            extension_days: DEFAULT_EXTENSION_DAYS,
            warning_days: DEFAULT_WARNING_DAYS,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            operator_email: DEFAULT_OPERATOR_EMAIL.to_string(),
            operator_password: DEFAULT_OPERATOR_PASSWORD.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            extension_days: self.extension_days,
            warning_days: self.warning_days,
            hash_iterations: self.hash_iterations,
        }
    }

    /// Reject settings no rule can work with.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.extension_days <= 0 {
            return Err(LedgerError::InvalidExtension(self.extension_days));
        }
        if self.warning_days < 0 {
            return Err(LedgerError::InvalidInput(format!(
                "warning threshold must not be negative, got {}",
                self.warning_days
            )));
        }
        if self.hash_iterations == 0 {
            return Err(LedgerError::InvalidInput("hash iterations must be at least 1".into()));
        }
        if self.operator_email.trim().is_empty() || self.operator_password.is_empty() {
            return Err(LedgerError::InvalidInput("operator credentials must be set".into()));
        }
        Ok(())
    }
}
