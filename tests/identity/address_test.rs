// Address Tests
// Tests for ledger account addresses derived from Ed25519 keys

use flightsure::identity::{Address, AddressError, Keypair};

// ============================================================================
// DERIVATION
// ============================================================================

#[test]
fn test_address_from_keypair_is_stable() {
    let kp = Keypair::generate();
    assert_eq!(kp.address(), Address::from_public_key(&kp.public_key()));
}

#[test]
fn test_different_keypairs_different_addresses() {
    let a = Keypair::generate();
    let b = Keypair::generate();
    assert_ne!(a.address(), b.address());
}

#[test]
fn test_display_has_prefix() {
    let kp = Keypair::generate();
    assert!(kp.address().to_string().starts_with("acct:"));
}

// ============================================================================
// PARSING
// ============================================================================

#[test]
fn test_parse_roundtrip() {
    let kp = Keypair::generate();
    let text = kp.address().to_string();
    assert_eq!(Address::parse(&text).unwrap(), kp.address());
}

#[test]
fn test_parse_empty_fails() {
    assert!(matches!(Address::parse(""), Err(AddressError::InvalidFormat(_))));
}

#[test]
fn test_parse_missing_prefix_fails() {
    let kp = Keypair::generate();
    let text = kp.address().to_string();
    let bare = text.trim_start_matches("acct:");
    assert!(matches!(Address::parse(bare), Err(AddressError::InvalidFormat(_))));
}

#[test]
fn test_parse_invalid_base58_fails() {
    // '0' and 'l' are outside the base58 alphabet
    assert!(matches!(
        Address::parse("acct:0l0l0l"),
        Err(AddressError::InvalidBase58(_))
    ));
}

#[test]
fn test_parse_wrong_length_fails() {
    let short = format!("acct:{}", bs58::encode([7u8; 16]).into_string());
    assert!(matches!(Address::parse(&short), Err(AddressError::InvalidLength(16))));
}

#[test]
fn test_synthetic_address_roundtrip() {
    let addr = Address::from_bytes([42u8; 32]);
    assert_eq!(Address::parse(&addr.to_string()).unwrap(), addr);
    assert_eq!(addr.as_bytes(), &[42u8; 32]);
}
