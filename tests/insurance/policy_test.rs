// Policy Book Tests
// Tests for purchase ordering, the flight index and payout planning

use flightsure::identity::Address;
use flightsure::insurance::PolicyBook;
use flightsure::ledger::{Amount, PayoutBasis};

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 32])
}

fn amount(text: &str) -> Amount {
    text.parse().unwrap()
}

// ============================================================================
// APPEND & LOOKUP
// ============================================================================

#[test]
fn test_positions_follow_purchase_order() {
    let mut book = PolicyBook::new();
    assert_eq!(book.append("AB100", addr(1), Amount::units(1), Amount::units(1)), 0);
    assert_eq!(book.append("CD200", addr(2), Amount::units(1), Amount::units(1)), 1);
    assert_eq!(book.append("AB100", addr(3), amount("0.5"), amount("0.5")), 2);

    assert_eq!(book.len(), 3);
    assert_eq!(book.get(2).unwrap().passenger(), &addr(3));
    assert!(book.get(3).is_none());
}

#[test]
fn test_flight_lookup_by_content() {
    let mut book = PolicyBook::new();
    book.append("AB100", addr(1), Amount::units(1), Amount::units(1));
    book.append("AB1000", addr(2), Amount::units(1), Amount::units(1));
    let flight = String::from("AB") + "100";
    book.append(&flight, addr(3), Amount::units(1), Amount::units(1));

    let matches: Vec<u64> = book.for_flight("AB100").iter().map(|p| p.position()).collect();
    assert_eq!(matches, vec![0, 2]);
    assert!(book.for_flight("ab100").is_empty());
}

#[test]
fn test_passenger_lookup() {
    let mut book = PolicyBook::new();
    book.append("AB100", addr(1), Amount::units(1), Amount::units(1));
    book.append("CD200", addr(2), Amount::units(1), Amount::units(1));
    book.append("EF300", addr(1), Amount::units(1), Amount::units(1));

    let flights: Vec<&str> = book.for_passenger(&addr(1)).iter().map(|p| p.flight()).collect();
    assert_eq!(flights, vec!["AB100", "EF300"]);
}

// ============================================================================
// CREDIT PLANNING
// ============================================================================

#[test]
fn test_plan_then_settle_is_idempotent() {
    let mut book = PolicyBook::new();
    book.append("XY1", addr(1), Amount::units(1), Amount::units(1));
    book.append("XY1", addr(2), amount("0.4"), amount("0.4"));

    let planned = book.plan_credits("XY1", 15_000, PayoutBasis::Declared).unwrap();
    assert_eq!(planned.len(), 2);
    assert_eq!(planned[0].payout, amount("1.5"));
    assert_eq!(planned[1].payout, amount("0.6"));

    book.settle(&planned);
    assert!(book.policies().iter().all(|p| p.is_settled()));
    assert!(book.plan_credits("XY1", 15_000, PayoutBasis::Declared).unwrap().is_empty());
}

#[test]
fn test_settled_records_are_kept() {
    let mut book = PolicyBook::new();
    book.append("XY1", addr(1), Amount::units(1), Amount::units(1));
    let planned = book.plan_credits("XY1", 15_000, PayoutBasis::Declared).unwrap();
    book.settle(&planned);

    let policy = book.get(0).unwrap();
    assert_eq!(policy.amount(), Amount::ZERO);
    assert_eq!(policy.retained(), Amount::units(1));
    assert_eq!(policy.flight(), "XY1");
}

#[test]
fn test_overpaid_policy_payout_basis() {
    let mut book = PolicyBook::new();
    book.append("XY1", addr(1), amount("1.5"), Amount::units(1));

    let declared = book.plan_credits("XY1", 15_000, PayoutBasis::Declared).unwrap();
    assert_eq!(declared[0].payout, amount("2.25"));

    let retained = book.plan_credits("XY1", 15_000, PayoutBasis::Retained).unwrap();
    assert_eq!(retained[0].payout, amount("1.5"));
}

#[test]
fn test_committed_float_drops_after_settle() {
    let mut book = PolicyBook::new();
    book.append("XY1", addr(1), amount("1.5"), Amount::units(1));
    book.append("ZZ9", addr(2), amount("0.3"), amount("0.3"));
    assert_eq!(book.committed_float(), amount("1.3"));

    let planned = book.plan_credits("XY1", 15_000, PayoutBasis::Declared).unwrap();
    book.settle(&planned);
    assert_eq!(book.committed_float(), amount("0.3"));
}

#[test]
fn test_rebuild_index_after_decode() {
    let mut book = PolicyBook::new();
    book.append("XY1", addr(1), Amount::units(1), Amount::units(1));
    book.append("XY2", addr(2), Amount::units(1), Amount::units(1));

    let bytes = postcard::to_allocvec(&book).unwrap();
    let mut restored: PolicyBook = postcard::from_bytes(&bytes).unwrap();
    assert!(restored.for_flight("XY2").is_empty());

    restored.rebuild_index();
    assert_eq!(restored.for_flight("XY2").len(), 1);
    assert_eq!(restored.for_flight("XY2")[0].position(), 1);
}
