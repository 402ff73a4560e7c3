// Signer Tests

use flightsure::identity::{Keypair, Signature, SignatureError, Signer};

#[test]
fn test_sign_verify() {
    let kp = Keypair::generate();
    let sig = Signer::sign(&kp, b"buy XY1");
    assert!(Signer::verify(&kp.public_key(), b"buy XY1", &sig));
}

#[test]
fn test_tampered_message_fails() {
    let kp = Keypair::generate();
    let sig = Signer::sign(&kp, b"buy XY1");
    assert!(!Signer::verify(&kp.public_key(), b"buy XY2", &sig));
}

#[test]
fn test_signature_bytes_roundtrip() {
    let kp = Keypair::generate();
    let sig = Signer::sign(&kp, b"withdraw");
    let restored = Signature::from_bytes(sig.as_bytes()).unwrap();
    assert_eq!(sig, restored);
    assert!(Signer::verify(&kp.public_key(), b"withdraw", &restored));
}

#[test]
fn test_signature_wrong_length() {
    assert!(matches!(
        Signature::from_bytes(&[0u8; 63]),
        Err(SignatureError::InvalidLength(63))
    ));
}

#[test]
fn test_signature_is_deterministic() {
    let kp = Keypair::generate();
    assert_eq!(Signer::sign(&kp, b"fund"), Signer::sign(&kp, b"fund"));
}
