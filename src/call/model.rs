use crate::identity::{Address, PublicKey, Signature, Signer};
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Unique identifier for a call (SHA256 of its signing bytes)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId([u8; 32]);

impl CallId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call:{}", hex::encode(&self.0[..8]))
    }
}

/// Entry point selected by a call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    RegisterAirline { candidate: Address },
    Fund,
    Buy { flight: String },
    CreditInsurees { flight: String },
    Withdraw,
    SetOperatingStatus { operational: bool },
    AuthorizeCaller { identity: Address },
    DeauthorizeCaller { identity: Address },
    Capitalize,
}

impl Operation {
    /// Operations that accept attached value
    pub fn is_payable(&self) -> bool {
        matches!(self, Operation::Fund | Operation::Buy { .. } | Operation::Capitalize)
    }

    /// Operations reached through the app gateway rather than administered
    /// by the owner
    pub fn is_app_facing(&self) -> bool {
        matches!(
            self,
            Operation::RegisterAirline { .. }
                | Operation::Fund
                | Operation::Buy { .. }
                | Operation::CreditInsurees { .. }
                | Operation::Withdraw
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::RegisterAirline { .. } => "registerAirline",
            Operation::Fund => "fund",
            Operation::Buy { .. } => "buy",
            Operation::CreditInsurees { .. } => "creditInsurees",
            Operation::Withdraw => "withdraw",
            Operation::SetOperatingStatus { .. } => "setOperatingStatus",
            Operation::AuthorizeCaller { .. } => "authorizeCaller",
            Operation::DeauthorizeCaller { .. } => "deauthorizeCaller",
            Operation::Capitalize => "capitalize",
        }
    }
}

/// An unsigned request from `caller`
///
/// `operation` is `None` for a bare currency transfer with no selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    caller: Address,
    operation: Option<Operation>,
    value: Amount,
    nonce: u64,
    timestamp: u64,
}

impl Call {
    pub fn new(
        caller: Address,
        operation: Option<Operation>,
        value: Amount,
        nonce: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            caller,
            operation,
            value,
            nonce,
            timestamp,
        }
    }

    pub fn caller(&self) -> &Address {
        &self.caller
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    /// Currency attached to the call
    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn id(&self) -> CallId {
        let hash = Sha256::digest(self.to_signing_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&hash);
        CallId(id)
    }

    /// Deterministic bytes covered by the signature
    pub fn to_signing_bytes(&self) -> Vec<u8> {
        // An empty payload never verifies
        postcard::to_allocvec(self).unwrap_or_default()
    }
}

/// A call together with the caller's signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    call: Call,
    signature: Signature,
}

impl SignedCall {
    pub fn from_parts(call: Call, signature: Signature) -> Self {
        Self { call, signature }
    }

    pub fn call(&self) -> &Call {
        &self.call
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn id(&self) -> CallId {
        self.call.id()
    }

    /// Verify the signature against a public key
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        let bytes = self.call.to_signing_bytes();
        !bytes.is_empty() && Signer::verify(public_key, &bytes, &self.signature)
    }
}
