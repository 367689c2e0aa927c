/// Cafe Ledger: Entitlement Engine
///
/// The extension rule:
///   - absent expiry            -> today + days
///   - expiry <  today (lapsed) -> today + days   (lapsed remainder discarded)
///   - expiry >= today (active) -> expiry + days  (stacks onto what is left)
///   - unparseable expiry       -> today + days   (recover, do not fail)
///
/// The tie at `expiry == today` counts as active.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::dates::{add_days, format_expiry, parse_expiry};
use crate::domain::AccountId;
use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

/// Pure rule: the expiry after granting `days` on `today`.
pub fn next_expiry(
    current: Option<&str>,
    today: NaiveDate,
    days: i64,
) -> LedgerResult<NaiveDate> {
    if days <= 0 {
        return Err(LedgerError::InvalidExtension(days));
    }

    let base = match current.map(|raw| (raw, parse_expiry(raw))) {
        None => today,
        Some((_, Some(expiry))) if expiry >= today => expiry,
        Some((_, Some(_))) => today,
        Some((raw, None)) => {
            warn!(raw, "unparseable stored expiry, restarting from today");
            today
        }
    };

    add_days(base, days).ok_or(LedgerError::InvalidExtension(days))
}

/// Grant `days` of entitlement to an account and persist the new expiry.
pub fn extend<S: LedgerStore, C: Clock>(
    store: &mut S,
    clock: &C,
    account_id: AccountId,
    days: i64,
) -> LedgerResult<NaiveDate> {
    let account = store
        .get_account(account_id)?
        .ok_or(LedgerError::NotFound(account_id))?;

    let today = clock.today();
    let new_expiry = next_expiry(account.entitlement_expiry.as_deref(), today, days)?;
    store.update_expiry(account_id, &format_expiry(new_expiry))?;

    info!(
        account = %account_id,
        previous = account.entitlement_expiry.as_deref().unwrap_or("none"),
        new_expiry = %new_expiry,
        "entitlement extended"
    );
    Ok(new_expiry)
}
