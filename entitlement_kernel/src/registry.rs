/// Cafe Ledger: Account Registry
///
/// Identity CRUD over a `LedgerStore`. Login failures never say whether
/// the email or the password was wrong.

use tracing::{debug, info, warn};

use crate::credential;
use crate::domain::{AccountId, AccountSummary, MemberEntry, NewAccount, Role};
use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

/// Well-known operator created on first start.
pub const DEFAULT_OPERATOR_EMAIL: &str = "admin@arcelor.com";
/// Password of the bootstrap operator. Rotate it after first login.
pub const DEFAULT_OPERATOR_PASSWORD: &str = "admin";

/// Look up by exact email and check the password.
///
/// Legacy unsalted digests are upgraded in place after a successful match.
pub fn authenticate<S: LedgerStore>(
    store: &mut S,
    email: &str,
    plaintext: &str,
    hash_iterations: u32,
) -> LedgerResult<Option<AccountSummary>> {
    let Some(account) = store.find_account_by_email(email)? else {
        debug!("login rejected");
        return Ok(None);
    };
    if !credential::verify(plaintext, &account.credential_hash) {
        debug!("login rejected");
        return Ok(None);
    }

    if credential::is_legacy(&account.credential_hash) {
        warn!(account = %account.id, "upgrading legacy unsalted credential");
        // Best effort; the login itself already succeeded.
        let upgraded = credential::hash(plaintext, hash_iterations).and_then(|digest| {
            store
                .update_credential(account.id, &digest)
                .map_err(LedgerError::from)
        });
        if let Err(err) = upgraded {
            warn!(account = %account.id, error = %err, "legacy credential upgrade failed");
        }
    }

    Ok(Some(AccountSummary::from(&account)))
}

/// Create a member account with no entitlement.
pub fn create<S: LedgerStore>(
    store: &mut S,
    email: &str,
    plaintext: &str,
    hash_iterations: u32,
) -> LedgerResult<AccountId> {
    insert(store, email, plaintext, Role::Member, hash_iterations)
}

/// Remove an account. Succeeds whether or not it existed.
pub fn delete<S: LedgerStore>(store: &mut S, id: AccountId) -> LedgerResult<()> {
    store.delete_account(id)?;
    info!(account = %id, "account deleted");
    Ok(())
}

/// Rehash and store a new password. No existence check.
pub fn set_password<S: LedgerStore>(
    store: &mut S,
    id: AccountId,
    new_plaintext: &str,
    hash_iterations: u32,
) -> LedgerResult<()> {
    require_non_empty("password", new_plaintext)?;
    let digest = credential::hash(new_plaintext, hash_iterations)?;
    store.update_credential(id, &digest)?;
    info!(account = %id, "password changed");
    Ok(())
}

/// Members only, ascending by id.
pub fn list_members<S: LedgerStore>(store: &S) -> LedgerResult<Vec<MemberEntry>> {
    Ok(store
        .list_accounts()?
        .iter()
        .filter(|a| a.role == Role::Member)
        .map(MemberEntry::from)
        .collect())
}

/// Fresh read of an account's role and entitlement.
pub fn account_summary<S: LedgerStore>(
    store: &S,
    id: AccountId,
) -> LedgerResult<Option<AccountSummary>> {
    Ok(store.get_account(id)?.as_ref().map(AccountSummary::from))
}

/// Ensure the operator account exists. Returns `true` if it was created.
pub fn bootstrap_operator<S: LedgerStore>(
    store: &mut S,
    email: &str,
    plaintext: &str,
    hash_iterations: u32,
) -> LedgerResult<bool> {
    if store.find_account_by_email(email)?.is_some() {
        return Ok(false);
    }
    let id = insert(store, email, plaintext, Role::Operator, hash_iterations)?;
    info!(account = %id, email, "operator account bootstrapped");
    Ok(true)
}

fn insert<S: LedgerStore>(
    store: &mut S,
    email: &str,
    plaintext: &str,
    role: Role,
    hash_iterations: u32,
) -> LedgerResult<AccountId> {
    require_non_empty("email", email)?;
    require_non_empty("password", plaintext)?;

    if store.find_account_by_email(email)?.is_some() {
        return Err(LedgerError::DuplicateEmail(email.to_string()));
    }

    let credential_hash = credential::hash(plaintext, hash_iterations)?;
    let id = store.insert_account(NewAccount {
        email: email.to_string(),
        credential_hash,
        role,
    })?;
    info!(account = %id, email, ?role, "account created");
    Ok(id)
}

fn require_non_empty(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
