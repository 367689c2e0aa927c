//! Account snapshot file: the durable account table.
//!
//! On-disk format: a JSON envelope carrying the encoded table and its
//! SHA-256, so a damaged or hand-edited file is detected on load.
//!
//! Writes go to a temp file, are fsynced, then renamed over the old
//! snapshot. A crash leaves either the old or the new table, never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use entitlement_kernel::store::AccountTable;

use crate::snapshot_codec::{encode_table, restore_table, table_hash, SnapshotError};

/// Current envelope version.
pub const FORMAT_VERSION: u32 = 1;

/// Snapshot on-disk format.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub format_version: u32,
    /// JSON encoding of the account table.
    pub table_json: String,
    /// SHA-256 of `table_json`.
    pub hash: String,
}

/// Atomically replace the snapshot at `path` with `table`.
pub fn save_accounts(path: &Path, table: &AccountTable) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let table_json = encode_table(table)?;
    let snap = Snapshot {
        format_version: FORMAT_VERSION,
        hash: table_hash(&table_json),
        table_json,
    };
    let content = serde_json::to_string(&snap)
        .map_err(|e| SnapshotError::SerializationError(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    debug!(path = %path.display(), accounts = table.accounts.len(), "account snapshot saved");
    Ok(())
}

/// Load the snapshot at `path`. `None` if no snapshot exists yet.
pub fn load_accounts(path: &Path) -> Result<Option<AccountTable>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let snap: Snapshot = serde_json::from_str(&content)
        .map_err(|e| SnapshotError::DeserializationError(format!("Bad snapshot: {}", e)))?;

    if snap.format_version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snap.format_version));
    }
    verify_snapshot_hash(&snap)?;

    restore_table(&snap.table_json).map(Some)
}

/// Verify a snapshot's internal hash consistency.
pub fn verify_snapshot_hash(snap: &Snapshot) -> Result<(), SnapshotError> {
    let computed = table_hash(&snap.table_json);
    if computed != snap.hash {
        return Err(SnapshotError::ChecksumMismatch {
            expected: snap.hash.clone(),
            computed,
        });
    }
    Ok(())
}
