//! Snapshot Codec: deterministic account table encoder/decoder.
//!
//! Pure codec layer. No side-effects, no envelope.
//!
//! - `encode_table`:  AccountTable → JSON string
//! - `decode_table`:  JSON string → AccountTable (strict, no defaults)
//! - `restore_table`: decode + table invariant validation
//! - `table_hash`:    SHA-256 of a JSON encoding (lowercase hex)

use sha2::{Digest, Sha256};
use thiserror::Error;

use entitlement_kernel::invariants::try_validate_table;
use entitlement_kernel::store::AccountTable;
use entitlement_kernel::StoreError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// All possible snapshot codec failures.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("SerializationError: {0}")]
    SerializationError(String),
    /// Malformed JSON, missing fields or unknown fields.
    #[error("DeserializationError: {0}")]
    DeserializationError(String),
    #[error("InvariantViolation: {0}")]
    InvariantViolation(String),
    /// Stored checksum does not match the stored content.
    #[error("ChecksumMismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },
    #[error("UnsupportedVersion: {0}")]
    UnsupportedVersion(u32),
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<SnapshotError> for StoreError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::IoError(e) => StoreError::Io(e),
            SnapshotError::SerializationError(msg) => StoreError::Codec(msg),
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder / decoder
// ---------------------------------------------------------------------------

/// Encode an account table to compact JSON. Rows stay in id order.
pub fn encode_table(table: &AccountTable) -> Result<String, SnapshotError> {
    serde_json::to_string(table).map_err(|e| SnapshotError::SerializationError(e.to_string()))
}

/// Strict decode: unknown fields rejected, missing fields fail.
/// No invariant validation; use `restore_table` for validated loading.
pub fn decode_table(json: &str) -> Result<AccountTable, SnapshotError> {
    serde_json::from_str::<AccountTable>(json)
        .map_err(|e| SnapshotError::DeserializationError(e.to_string()))
}

/// Decode and validate table invariants. Safe entry point for loading.
pub fn restore_table(json: &str) -> Result<AccountTable, SnapshotError> {
    let table = decode_table(json)?;
    try_validate_table(&table).map_err(SnapshotError::InvariantViolation)?;
    Ok(table)
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// SHA-256 of the given JSON text. Lowercase hex string.
pub fn table_hash(json: &str) -> String {
    hex::encode(Sha256::digest(json.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitlement_kernel::domain::{Account, AccountId, Role};

    fn make_test_table() -> AccountTable {
        AccountTable {
            next_id: 4,
            accounts: vec![
                Account {
                    id: AccountId(1),
                    email: "admin@arcelor.com".to_string(),
                    credential_hash: "sha256i$1$00$ab".to_string(),
                    role: Role::Operator,
                    entitlement_expiry: None,
                },
                Account {
                    id: AccountId(3),
                    email: "ana@example.com".to_string(),
                    credential_hash: "sha256i$1$01$cd".to_string(),
                    role: Role::Member,
                    entitlement_expiry: Some("2024-05-31".to_string()),
                },
            ],
        }
    }

    #[test]
    fn encode_decode_encode_is_stable() {
        let table = make_test_table();
        let json1 = encode_table(&table).unwrap();
        let decoded = decode_table(&json1).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(json1, encode_table(&decoded).unwrap());
    }

    #[test]
    fn role_is_stored_lowercase() {
        let json = encode_table(&make_test_table()).unwrap();
        assert!(json.contains(r#""role":"operator""#));
        assert!(json.contains(r#""role":"member""#));
    }

    #[test]
    fn duplicate_email_returns_invariant_violation() {
        let mut table = make_test_table();
        table.accounts[1].email = "admin@arcelor.com".to_string();
        let json = encode_table(&table).unwrap();
        match restore_table(&json).unwrap_err() {
            SnapshotError::InvariantViolation(msg) => assert!(msg.contains("unique_email")),
            other => panic!("Expected InvariantViolation, got: {:?}", other),
        }
    }

    #[test]
    fn unknown_field_returns_deserialization_error() {
        let json = r#"{"next_id":1,"accounts":[],"extra":true}"#;
        assert!(matches!(
            decode_table(json),
            Err(SnapshotError::DeserializationError(_))
        ));
    }

    #[test]
    fn missing_field_returns_deserialization_error() {
        let json = r#"{"accounts":[]}"#;
        assert!(matches!(
            decode_table(json),
            Err(SnapshotError::DeserializationError(_))
        ));
    }

    #[test]
    fn hash_is_deterministic() {
        let json = encode_table(&make_test_table()).unwrap();
        assert_eq!(table_hash(&json), table_hash(&json));
        assert_eq!(table_hash(&json).len(), 64);
    }
}
