//! Behavioural tests for the ledger facade over the in-memory store.
//!
//! Every test runs on a frozen clock so date arithmetic is exact.

use chrono::{NaiveDate, TimeZone, Utc};

use entitlement_kernel::access::EntitlementStatus;
use entitlement_kernel::clock::FixedClock;
use entitlement_kernel::credential;
use entitlement_kernel::domain::{
    AccountId, LedgerPolicy, NewAccount, Role, BAG_OPENED, COUNTER_READING,
};
use entitlement_kernel::registry::{DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD};
use entitlement_kernel::store::{LedgerStore, MemoryStore};
use entitlement_kernel::{Ledger, LedgerError};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn today() -> NaiveDate {
    d(2024, 5, 10)
}

fn policy() -> LedgerPolicy {
    LedgerPolicy {
        hash_iterations: 4,
        ..LedgerPolicy::default()
    }
}

fn ledger() -> (Ledger<MemoryStore, FixedClock>, FixedClock) {
    let clock = FixedClock::on(today());
    (Ledger::with_clock(MemoryStore::new(), clock.clone(), policy()), clock)
}

// ─────────────────────────────────────────────────────────────
// Access gate
// ─────────────────────────────────────────────────────────────

#[test]
fn new_member_is_never_subscribed() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    assert_eq!(
        ledger.status_of(id).unwrap(),
        Some(EntitlementStatus::NeverSubscribed)
    );
}

#[test]
fn last_day_reports_valid_zero() {
    let (mut ledger, clock) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    ledger.extend(id).unwrap();
    clock.advance_days(21);
    assert_eq!(ledger.status_of(id).unwrap(), Some(EntitlementStatus::Valid(0)));
    clock.advance_days(1);
    assert_eq!(ledger.status_of(id).unwrap(), Some(EntitlementStatus::Expired(1)));
}

#[test]
fn status_of_deleted_account_is_none() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    ledger.delete(id).unwrap();
    assert_eq!(ledger.status_of(id).unwrap(), None);
}

// ─────────────────────────────────────────────────────────────
// Entitlement engine
// ─────────────────────────────────────────────────────────────

#[test]
fn first_extension_starts_today() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    assert_eq!(ledger.extend(id).unwrap(), d(2024, 5, 31));
}

#[test]
fn extensions_stack_while_active() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    let first = ledger.extend(id).unwrap();
    let second = ledger.extend(id).unwrap();
    assert_eq!(first, d(2024, 5, 31));
    assert_eq!(second, d(2024, 6, 21));
    assert_eq!(ledger.status_of(id).unwrap(), Some(EntitlementStatus::Valid(42)));
}

#[test]
fn lapsed_entitlement_restarts_from_today() {
    let (mut ledger, clock) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    ledger.extend(id).unwrap();
    clock.advance_days(30);
    assert_eq!(ledger.extend(id).unwrap(), d(2024, 6, 30));
}

#[test]
fn extend_unknown_account_is_not_found() {
    let (mut ledger, _) = ledger();
    let err = ledger.extend(AccountId(99)).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(AccountId(99))));
}

#[test]
fn malformed_expiry_is_surfaced_then_recovered() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    ledger.store_mut().force_expiry(id, "10/05/2024");

    assert_eq!(
        ledger.status_of(id).unwrap(),
        Some(EntitlementStatus::MalformedData("10/05/2024".to_string()))
    );
    assert_eq!(ledger.extend(id).unwrap(), d(2024, 5, 31));
    assert_eq!(ledger.status_of(id).unwrap(), Some(EntitlementStatus::Valid(21)));
}

#[test]
fn custom_extension_length() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    assert_eq!(ledger.extend_by(id, 7).unwrap(), d(2024, 5, 17));
    assert!(matches!(
        ledger.extend_by(id, 0),
        Err(LedgerError::InvalidExtension(0))
    ));
}

// ─────────────────────────────────────────────────────────────
// Account registry
// ─────────────────────────────────────────────────────────────

#[test]
fn duplicate_create_leaves_existing_account_untouched() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "first").unwrap();
    ledger.extend(id).unwrap();
    let before = ledger.store().get_account(id).unwrap().unwrap();

    let err = ledger.create("ana@example.com", "second").unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateEmail(ref e) if e == "ana@example.com"));

    let after = ledger.store().get_account(id).unwrap().unwrap();
    assert_eq!(before, after);
    assert_eq!(ledger.list_members().unwrap().len(), 1);
    assert!(ledger.authenticate("ana@example.com", "first").unwrap().is_some());
}

#[test]
fn wrong_password_looks_like_unknown_email() {
    let (mut ledger, _) = ledger();
    ledger.create("ana@example.com", "pw").unwrap();
    let wrong = ledger.authenticate("ana@example.com", "nope").unwrap();
    let unknown = ledger.authenticate("bob@example.com", "pw").unwrap();
    assert_eq!(wrong, None);
    assert_eq!(unknown, None);
}

#[test]
fn authenticate_returns_named_summary() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    ledger.extend(id).unwrap();
    let summary = ledger.authenticate("ana@example.com", "pw").unwrap().unwrap();
    assert_eq!(summary.id, id);
    assert_eq!(summary.role, Role::Member);
    assert_eq!(summary.entitlement_expiry.as_deref(), Some("2024-05-31"));
}

#[test]
fn set_password_round_trip() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "old").unwrap();
    ledger.set_password(id, "new").unwrap();
    assert!(ledger.authenticate("ana@example.com", "new").unwrap().is_some());
    assert!(ledger.authenticate("ana@example.com", "old").unwrap().is_none());
}

#[test]
fn set_password_and_delete_on_unknown_id_succeed() {
    let (mut ledger, _) = ledger();
    assert!(ledger.set_password(AccountId(7), "pw").is_ok());
    assert!(ledger.delete(AccountId(7)).is_ok());
}

#[test]
fn empty_credentials_rejected() {
    let (mut ledger, _) = ledger();
    assert!(matches!(ledger.create("", "pw"), Err(LedgerError::InvalidInput(_))));
    assert!(matches!(ledger.create("a@x", ""), Err(LedgerError::InvalidInput(_))));
    let id = ledger.create("a@x", "pw").unwrap();
    assert!(matches!(ledger.set_password(id, " "), Err(LedgerError::InvalidInput(_))));
}

#[test]
fn list_members_excludes_operators_in_id_order() {
    let (mut ledger, _) = ledger();
    ledger
        .bootstrap_operator(DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD)
        .unwrap();
    let b = ledger.create("b@example.com", "pw").unwrap();
    let a = ledger.create("a@example.com", "pw").unwrap();
    let members = ledger.list_members().unwrap();
    let ids: Vec<AccountId> = members.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![b, a]);
    assert_eq!(ledger.list_members().unwrap(), members);
}

#[test]
fn bootstrap_is_idempotent() {
    let (mut ledger, _) = ledger();
    assert!(ledger
        .bootstrap_operator(DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD)
        .unwrap());
    assert!(!ledger
        .bootstrap_operator(DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD)
        .unwrap());

    let operators: Vec<_> = ledger
        .store()
        .list_accounts()
        .unwrap()
        .into_iter()
        .filter(|a| a.role == Role::Operator)
        .collect();
    assert_eq!(operators.len(), 1);
    assert_eq!(operators[0].email, DEFAULT_OPERATOR_EMAIL);

    let summary = ledger
        .authenticate(DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD)
        .unwrap()
        .unwrap();
    assert_eq!(summary.role, Role::Operator);
}

#[test]
fn legacy_credential_upgraded_on_login() {
    let mut store = MemoryStore::new();
    let id = store
        .insert_account(NewAccount {
            email: "old@example.com".to_string(),
            credential_hash: credential::legacy_hash("123"),
            role: Role::Member,
        })
        .unwrap();
    let mut ledger = Ledger::with_clock(store, FixedClock::on(today()), policy());

    assert!(ledger.authenticate("old@example.com", "123").unwrap().is_some());
    let stored = ledger.store().get_account(id).unwrap().unwrap().credential_hash;
    assert!(!credential::is_legacy(&stored));
    assert!(ledger.authenticate("old@example.com", "123").unwrap().is_some());
}

// ─────────────────────────────────────────────────────────────
// Event log
// ─────────────────────────────────────────────────────────────

#[test]
fn events_are_stamped_by_the_clock() {
    let (mut ledger, clock) = ledger();
    clock.set(Utc.with_ymd_and_hms(2024, 5, 10, 8, 15, 0).unwrap());
    let id = ledger.append("test_event", Some(999)).unwrap();
    let events = ledger.events().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, id);
    assert_eq!(events[0].counter_value, Some(999));
    assert_eq!(
        events[0].timestamp,
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 15, 0).unwrap()
    );
}

#[test]
fn weekly_bag_report_groups_by_week() {
    let (mut ledger, clock) = ledger();
    // Mon 2024-05-06, Wed 2024-05-08, Mon 2024-05-13.
    clock.set(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
    ledger.record_bag_opened().unwrap();
    clock.advance_days(2);
    ledger.record_bag_opened().unwrap();
    ledger.record_counter_reading(1500).unwrap();
    clock.advance_days(5);
    ledger.record_bag_opened().unwrap();

    let report = ledger.stock_report(BAG_OPENED).unwrap();
    assert_eq!(report.events.len(), 4);
    assert_eq!(report.weekly.len(), 2);
    assert_eq!(report.weekly[0].week_start, d(2024, 5, 6));
    assert_eq!(report.weekly[0].count, 2);
    assert_eq!(report.weekly[1].week_start, d(2024, 5, 13));
    assert_eq!(report.weekly[1].count, 1);

    let counters: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.event_type == COUNTER_READING)
        .collect();
    assert_eq!(counters.len(), 1);
}

#[test]
fn deleting_account_keeps_events() {
    let (mut ledger, _) = ledger();
    let id = ledger.create("ana@example.com", "pw").unwrap();
    ledger.record_bag_opened().unwrap();
    ledger.delete(id).unwrap();
    assert_eq!(ledger.events().unwrap().len(), 1);
}

#[test]
fn member_overview_tiers() {
    let (mut ledger, _) = ledger();
    let fresh = ledger.create("fresh@example.com", "pw").unwrap();
    let closing = ledger.create("closing@example.com", "pw").unwrap();
    let lapsed = ledger.create("lapsed@example.com", "pw").unwrap();
    ledger.create("never@example.com", "pw").unwrap();

    ledger.extend(fresh).unwrap();
    ledger.store_mut().force_expiry(closing, "2024-05-12");
    ledger.store_mut().force_expiry(lapsed, "2024-05-01");

    use entitlement_kernel::access::Severity::*;
    let rows = ledger.member_overview().unwrap();
    let tiers: Vec<_> = rows.iter().map(|r| (r.severity, r.days_remaining)).collect();
    assert_eq!(
        tiers,
        vec![(Nominal, 21), (Warning, 2), (Critical, 0), (Critical, 0)]
    );
}
