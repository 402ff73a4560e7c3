// Call Builder Tests

use flightsure::call::{CallBuilder, CallError, Operation};
use flightsure::identity::{Address, Keypair};
use flightsure::ledger::Amount;

#[test]
fn test_build_buy_call() {
    let passenger = Keypair::generate();
    let signed = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "XY1".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();

    let call = signed.call();
    assert_eq!(call.caller(), &passenger.address());
    assert_eq!(call.value(), Amount::units(1));
    assert_eq!(
        call.operation(),
        Some(&Operation::Buy { flight: "XY1".to_string() })
    );
    assert!(signed.verify(&passenger.public_key()));
}

#[test]
fn test_missing_caller() {
    let result = CallBuilder::new().operation(Operation::Withdraw).build();
    assert!(matches!(result, Err(CallError::MissingCaller)));
}

#[test]
fn test_bare_transfer_needs_value() {
    let airline = Keypair::generate();
    let result = CallBuilder::new().caller(&airline).build();
    assert!(matches!(result, Err(CallError::EmptyTransfer)));

    let signed = CallBuilder::new()
        .caller(&airline)
        .value(Amount::units(10))
        .build()
        .unwrap();
    assert!(signed.call().operation().is_none());
}

#[test]
fn test_empty_flight_rejected() {
    let oracle = Keypair::generate();
    let result = CallBuilder::new()
        .caller(&oracle)
        .operation(Operation::CreditInsurees { flight: String::new() })
        .build();
    assert!(matches!(result, Err(CallError::EmptyFlight)));
}

#[test]
fn test_explicit_nonce_and_timestamp_give_same_id() {
    let kp = Keypair::generate();
    let build = || {
        CallBuilder::new()
            .caller(&kp)
            .operation(Operation::Withdraw)
            .nonce(7)
            .timestamp(1_700_000_000)
            .build()
            .unwrap()
    };
    assert_eq!(build().id(), build().id());
}

#[test]
fn test_random_nonce_gives_distinct_ids() {
    let kp = Keypair::generate();
    let candidate = Address::from_bytes([3u8; 32]);
    let a = CallBuilder::new()
        .caller(&kp)
        .operation(Operation::RegisterAirline { candidate })
        .build()
        .unwrap();
    let b = CallBuilder::new()
        .caller(&kp)
        .operation(Operation::RegisterAirline { candidate })
        .build()
        .unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_payable_and_app_facing_flags() {
    assert!(Operation::Fund.is_payable());
    assert!(Operation::Buy { flight: "A".into() }.is_payable());
    assert!(Operation::Capitalize.is_payable());
    assert!(!Operation::Withdraw.is_payable());
    assert!(!Operation::CreditInsurees { flight: "A".into() }.is_payable());

    assert!(Operation::Withdraw.is_app_facing());
    assert!(!Operation::SetOperatingStatus { operational: true }.is_app_facing());
    assert!(!Operation::Capitalize.is_app_facing());
}
