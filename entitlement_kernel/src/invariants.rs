/// Cafe Ledger: Account Table Invariants
///
/// Run whenever an account table is restored from durable storage.
/// Returns `Err(message)` on the first failure.
///
/// A malformed expiry is NOT a violation: it is data the access gate
/// reports and the entitlement engine recovers from.

use std::collections::BTreeSet;

use crate::store::AccountTable;

/// Run all table checks. `Ok(())` if every check passes.
pub fn try_validate_table(table: &AccountTable) -> Result<(), String> {
    check_ids_increasing(table)?;
    check_ids_below_next(table)?;
    check_unique_emails(table)?;
    check_required_fields(table)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

/// Rows are stored in strictly ascending id order, ids positive.
fn check_ids_increasing(table: &AccountTable) -> Result<(), String> {
    let mut last = 0i64;
    for account in &table.accounts {
        if account.id.0 <= last {
            return Err(format!(
                "[INVARIANT:id_order] Account id {} is not greater than previous id {}",
                account.id, last
            ));
        }
        last = account.id.0;
    }
    Ok(())
}

/// `next_id` is beyond every stored id, so ids are never handed out twice.
fn check_ids_below_next(table: &AccountTable) -> Result<(), String> {
    if let Some(max) = table.accounts.iter().map(|a| a.id.0).max() {
        if max >= table.next_id {
            return Err(format!(
                "[INVARIANT:next_id] next_id {} does not exceed stored id {}",
                table.next_id, max
            ));
        }
    }
    if table.next_id < 1 {
        return Err(format!("[INVARIANT:next_id] next_id {} must be positive", table.next_id));
    }
    Ok(())
}

fn check_unique_emails(table: &AccountTable) -> Result<(), String> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for account in &table.accounts {
        if !seen.insert(account.email.as_str()) {
            return Err(format!(
                "[INVARIANT:unique_email] Email {:?} is used by more than one account",
                account.email
            ));
        }
    }
    Ok(())
}

fn check_required_fields(table: &AccountTable) -> Result<(), String> {
    for account in &table.accounts {
        if account.email.is_empty() {
            return Err(format!("[INVARIANT:email_required] Account {} has an empty email", account.id));
        }
        if account.credential_hash.is_empty() {
            return Err(format!(
                "[INVARIANT:credential_required] Account {} has an empty credential hash",
                account.id
            ));
        }
    }
    Ok(())
}
