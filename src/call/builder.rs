use crate::call::{Call, Operation, SignedCall};
use crate::identity::{Keypair, Signer};
use crate::ledger::Amount;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur when building a call
#[derive(Error, Debug)]
pub enum CallError {
    #[error("Missing caller: caller keypair is required")]
    MissingCaller,

    #[error("Bare transfer carries no value")]
    EmptyTransfer,

    #[error("Empty flight identifier")]
    EmptyFlight,
}

/// Builder for signed ledger calls
pub struct CallBuilder<'a> {
    caller: Option<&'a Keypair>,
    operation: Option<Operation>,
    value: Amount,
    nonce: Option<u64>,
    timestamp: Option<u64>,
}

impl<'a> CallBuilder<'a> {
    pub fn new() -> Self {
        Self {
            caller: None,
            operation: None,
            value: Amount::ZERO,
            nonce: None,
            timestamp: None,
        }
    }

    /// Set the caller (required)
    pub fn caller(mut self, keypair: &'a Keypair) -> Self {
        self.caller = Some(keypair);
        self
    }

    /// Select the entry point; leave unset for a bare transfer
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Attach currency
    pub fn value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Set the nonce (optional - random if not provided)
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the timestamp (optional - now if not provided)
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build and sign the call
    pub fn build(self) -> Result<SignedCall, CallError> {
        let keypair = self.caller.ok_or(CallError::MissingCaller)?;

        match &self.operation {
            None if self.value.is_zero() => return Err(CallError::EmptyTransfer),
            Some(Operation::Buy { flight }) | Some(Operation::CreditInsurees { flight })
                if flight.is_empty() =>
            {
                return Err(CallError::EmptyFlight)
            }
            _ => {}
        }

        let nonce = self.nonce.unwrap_or_else(|| rand::thread_rng().gen::<u64>());
        let timestamp = self.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });

        let call = Call::new(keypair.address(), self.operation, self.value, nonce, timestamp);
        let signature = Signer::sign(keypair, &call.to_signing_bytes());

        Ok(SignedCall::from_parts(call, signature))
    }
}

impl<'a> Default for CallBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}
