// Dispatcher Tests
// Tests for signed-call routing, replay protection and the caller gate

use flightsure::call::{Call, CallBuilder, CallCodec, CallId, Operation, SignedCall};
use flightsure::gateway::{DispatchError, DispatchOutcome, Dispatcher, DispatcherConfig};
use flightsure::identity::{Keypair, Signer};
use flightsure::ledger::{Amount, FlightLedger, LedgerConfig, LedgerError};

struct Fixture {
    owner: Keypair,
    gateway: Keypair,
    ledger: FlightLedger,
    dispatcher: Dispatcher,
}

impl Fixture {
    fn new() -> Self {
        let owner = Keypair::generate();
        let gateway = Keypair::generate();
        let mut ledger = FlightLedger::deploy(owner.address(), LedgerConfig::default()).unwrap();
        ledger
            .authorize_caller(&owner.address(), gateway.address())
            .unwrap();
        Self {
            owner,
            gateway,
            ledger,
            dispatcher: Dispatcher::default(),
        }
    }

    fn dispatch(&mut self, call: &SignedCall) -> Result<DispatchOutcome, DispatchError> {
        let relayer = self.gateway.address();
        self.dispatcher
            .dispatch(&mut self.ledger, &relayer, call)
            .map(|r| r.outcome)
    }

    /// Register a fifth, unfunded airline and return its keypair
    fn unfunded_airline(&mut self) -> Keypair {
        for _ in 0..3 {
            let candidate = Keypair::generate().address();
            self.ledger
                .register_airline(candidate, self.owner.address())
                .unwrap();
        }
        let airline = Keypair::generate();
        self.ledger
            .register_airline(airline.address(), self.owner.address())
            .unwrap();
        airline
    }
}

// ============================================================================
// ROUTING
// ============================================================================

#[test]
fn test_bare_transfer_routes_to_fund() {
    let mut fx = Fixture::new();
    let airline = fx.unfunded_airline();

    let call = CallBuilder::new()
        .caller(&airline)
        .value(Amount::units(10))
        .build()
        .unwrap();
    let relayer = fx.gateway.address();
    let receipt = fx.dispatcher.dispatch(&mut fx.ledger, &relayer, &call).unwrap();

    assert_eq!(receipt.operation, "fund");
    assert_eq!(receipt.call_id, call.id());
    assert_eq!(
        receipt.outcome,
        DispatchOutcome::Funded {
            airline: airline.address(),
            amount: Amount::units(10),
        }
    );
    assert!(fx.ledger.is_airline_with_funds(&airline.address()));
}

#[test]
fn test_buy_routes_with_attached_value() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value("1.5".parse().unwrap())
        .build()
        .unwrap();

    match fx.dispatch(&call).unwrap() {
        DispatchOutcome::Purchased(receipt) => {
            assert_eq!(receipt.refund, "0.5".parse::<Amount>().unwrap());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fx.ledger.policies_for_passenger(&passenger.address()).len(), 1);
}

#[test]
fn test_dispatch_from_wire_bytes() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();
    let bytes = CallCodec::encode(&call).unwrap();

    let relayer = fx.gateway.address();
    let receipt = fx
        .dispatcher
        .dispatch_bytes(&mut fx.ledger, &relayer, &bytes)
        .unwrap();
    assert_eq!(receipt.operation, "buy");

    let result = fx
        .dispatcher
        .dispatch_bytes(&mut fx.ledger, &relayer, &bytes[..10]);
    assert!(matches!(result, Err(DispatchError::UnrecognizedCall(_))));
}

#[test]
fn test_trailing_bytes_not_dispatched() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();
    let mut bytes = CallCodec::encode(&call).unwrap();
    bytes.extend_from_slice(&[0x05, 0x00]);

    let relayer = fx.gateway.address();
    let result = fx.dispatcher.dispatch_bytes(&mut fx.ledger, &relayer, &bytes);
    assert!(matches!(result, Err(DispatchError::UnrecognizedCall(_))));
    assert!(fx.ledger.policies_for_passenger(&passenger.address()).is_empty());
    assert_eq!(fx.ledger.custody(), Amount::ZERO);
    assert!(!fx.dispatcher.has_processed(&call.id()));
}

#[test]
fn test_owner_operations_skip_caller_gate() {
    let mut fx = Fixture::new();
    let stranger = Keypair::generate().address();
    let call = CallBuilder::new()
        .caller(&fx.owner)
        .operation(Operation::SetOperatingStatus { operational: false })
        .build()
        .unwrap();

    let relayer = fx.gateway.address();
    fx.dispatcher
        .dispatch(&mut fx.ledger, &stranger, &call)
        .unwrap();
    assert!(!fx.ledger.is_operational());

    let resume = CallBuilder::new()
        .caller(&fx.owner)
        .operation(Operation::SetOperatingStatus { operational: true })
        .build()
        .unwrap();
    fx.dispatcher.dispatch(&mut fx.ledger, &relayer, &resume).unwrap();
    assert!(fx.ledger.is_operational());
}

// ============================================================================
// REJECTIONS
// ============================================================================

#[test]
fn test_replayed_call_rejected() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();

    fx.dispatch(&call).unwrap();
    assert!(fx.dispatcher.has_processed(&call.id()));

    let result = fx.dispatch(&call);
    assert!(matches!(result, Err(DispatchError::DuplicateCall(id)) if id == call.id()));
    assert_eq!(fx.ledger.policies().len(), 1);
}

#[test]
fn test_forged_signature_rejected() {
    let mut fx = Fixture::new();
    let victim = Keypair::generate();
    let attacker = Keypair::generate();

    let call = Call::new(victim.address(), Some(Operation::Withdraw), Amount::ZERO, 1, 0);
    let signature = Signer::sign(&attacker, &call.to_signing_bytes());
    let forged = SignedCall::from_parts(call, signature);

    assert!(matches!(fx.dispatch(&forged), Err(DispatchError::Invalid(_))));
    assert!(!fx.dispatcher.has_processed(&forged.id()));
}

#[test]
fn test_unauthorized_relayer_rejected() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();

    let stranger = Keypair::generate().address();
    let result = fx.dispatcher.dispatch(&mut fx.ledger, &stranger, &call);
    assert!(matches!(
        result,
        Err(DispatchError::Ledger(LedgerError::NotAuthorized))
    ));
    assert!(fx.ledger.policies().is_empty());
}

#[test]
fn test_caller_gate_can_be_disabled() {
    let mut fx = Fixture::new();
    let mut open = Dispatcher::new(DispatcherConfig::new().with_caller_authorization(false));
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();

    open.dispatch(&mut fx.ledger, &passenger.address(), &call).unwrap();
    assert_eq!(fx.ledger.policies().len(), 1);
}

#[test]
fn test_value_on_non_payable_rejected() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Withdraw)
        .value(Amount::units(1))
        .build()
        .unwrap();

    assert!(matches!(
        fx.dispatch(&call),
        Err(DispatchError::NonPayable("withdraw"))
    ));
}

#[test]
fn test_failed_call_can_be_resubmitted() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let pause = CallBuilder::new()
        .caller(&fx.owner)
        .operation(Operation::SetOperatingStatus { operational: false })
        .build()
        .unwrap();
    fx.dispatch(&pause).unwrap();

    let buy = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();
    assert!(matches!(
        fx.dispatch(&buy),
        Err(DispatchError::Ledger(LedgerError::NotOperational))
    ));
    assert!(!fx.dispatcher.has_processed(&buy.id()));

    fx.ledger
        .set_operating_status(&fx.owner.address(), true)
        .unwrap();
    fx.dispatch(&buy).unwrap();
}

#[test]
fn test_stale_call_rejected_when_age_limited() {
    let mut fx = Fixture::new();
    let mut strict = Dispatcher::new(DispatcherConfig::new().with_max_call_age_secs(60));
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Withdraw)
        .timestamp(1)
        .build()
        .unwrap();

    let relayer = fx.gateway.address();
    assert!(matches!(
        strict.dispatch(&mut fx.ledger, &relayer, &call),
        Err(DispatchError::Invalid(_))
    ));
}

#[test]
fn test_restored_replay_set() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .build()
        .unwrap();
    fx.dispatch(&call).unwrap();

    let mut restored =
        Dispatcher::with_processed(DispatcherConfig::default(), fx.dispatcher.processed_calls());
    let relayer = fx.gateway.address();
    assert!(matches!(
        restored.dispatch(&mut fx.ledger, &relayer, &call),
        Err(DispatchError::DuplicateCall(_))
    ));
}

// ============================================================================
// REPLAY SET PRUNING
// ============================================================================

#[test]
fn test_prune_keeps_entries_inside_window() {
    let config = DispatcherConfig::new().with_max_call_age_secs(60);
    let old = CallId::from_bytes([1u8; 32]);
    let recent = CallId::from_bytes([2u8; 32]);
    let mut dispatcher = Dispatcher::with_processed(config, vec![(old, 1_000), (recent, 1_950)]);

    assert_eq!(dispatcher.prune_expired(2_000), 1);
    assert!(!dispatcher.has_processed(&old));
    assert!(dispatcher.has_processed(&recent));
    assert_eq!(dispatcher.processed_calls(), vec![(recent, 1_950)]);
}

#[test]
fn test_prune_disabled_without_age_limit() {
    let old = CallId::from_bytes([1u8; 32]);
    let mut dispatcher = Dispatcher::with_processed(DispatcherConfig::default(), vec![(old, 1)]);
    assert_eq!(dispatcher.prune_expired(u64::MAX), 0);
    assert!(dispatcher.has_processed(&old));
}

#[test]
fn test_pruned_call_still_refused_as_stale() {
    let mut fx = Fixture::new();
    let passenger = Keypair::generate();
    let call = CallBuilder::new()
        .caller(&passenger)
        .operation(Operation::Buy { flight: "AB100".to_string() })
        .value(Amount::units(1))
        .timestamp(1)
        .build()
        .unwrap();

    let config = DispatcherConfig::new().with_max_call_age_secs(60);
    let mut dispatcher = Dispatcher::with_processed(config, vec![(call.id(), call.call().timestamp())]);
    let relayer = fx.gateway.address();
    let result = dispatcher.dispatch(&mut fx.ledger, &relayer, &call);

    assert!(matches!(result, Err(DispatchError::Invalid(_))));
    assert!(dispatcher.processed_calls().is_empty());
    assert!(fx.ledger.policies_for_passenger(&passenger.address()).is_empty());
}
